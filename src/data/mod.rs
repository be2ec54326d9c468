//! Observation-table handling: loading, schema, label mapping, and
//! feature engineering.

mod features;
mod labels;
mod loader;
mod schema;

pub use features::{FeatureEngineer, FeatureTable};
pub use labels::{map_labels, MappedLabels};
pub use loader::DataLoader;
pub use schema::{DataSchema, DenominatorTransform, FieldSchema, RatioFeature};

use crate::error::Result;
use polars::prelude::*;

/// Restrict a frame to the given row positions, preserving their order.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_rows() {
        let df = df!(
            "a" => &[10, 20, 30, 40]
        )
        .unwrap();

        let taken = take_rows(&df, &[0, 2]).unwrap();
        assert_eq!(taken.height(), 2);
        let values: Vec<Option<i32>> = taken
            .column("a")
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(10), Some(30)]);
    }
}
