//! Derived-feature engineering
//!
//! Appends engineered columns to an observation table and produces the
//! pruned numeric feature table fed to the classifier. Every derived
//! feature is computed independently and best-effort: a feature whose
//! source columns are missing is skipped, and a feature whose computation
//! fails is omitted without affecting the others.

use crate::data::schema::{DataSchema, DenominatorTransform, FieldSchema, RatioFeature};
use crate::error::{try_compute, ExoSeekrError, Result};
use ndarray::Array2;
use polars::prelude::*;
use std::collections::HashMap;

/// The engineered, pruned, numeric-only matrix plus its bookkeeping:
/// surviving column names and the original row indices of each sample.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub x: Array2<f64>,
    pub columns: Vec<String>,
    pub row_indices: Vec<usize>,
}

impl FeatureTable {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Restrict the table to the given sample positions.
    pub fn subset(&self, rows: &[usize]) -> FeatureTable {
        FeatureTable {
            x: self.x.select(ndarray::Axis(0), rows),
            columns: self.columns.clone(),
            row_indices: rows.iter().map(|&i| self.row_indices[i]).collect(),
        }
    }
}

/// Schema-driven feature engineering
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    schema: DataSchema,
}

impl FeatureEngineer {
    pub fn new(schema: DataSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &DataSchema {
        &self.schema
    }

    /// Append every derivable engineered column to the frame.
    ///
    /// Original columns are left untouched. Deterministic for a given input.
    pub fn transform(&self, df: &DataFrame) -> DataFrame {
        let mut result = df.clone();

        if df.column(&self.schema.group_key).is_ok() {
            if let Some(series) = try_compute("multiplicity", || self.multiplicity(df)) {
                let _ = result.with_column(series);
            }
        }

        for field in &self.schema.fields {
            if field.has_error_pair
                && df.column(&field.name).is_ok()
                && df.column(&field.err1_column()).is_ok()
                && df.column(&field.err2_column()).is_ok()
            {
                let name = format!("relative_uncertainty_{}", field.name);
                if let Some(series) = try_compute(&name, || self.relative_uncertainty(df, field)) {
                    let _ = result.with_column(series);
                }
            }

            if field.has_limit_flag && df.column(&field.limit_column()).is_ok() {
                let name = format!("is_limited_{}", field.name);
                if let Some(series) = try_compute(&name, || self.limit_flag(df, field)) {
                    let _ = result.with_column(series);
                }
            }
        }

        for ratio in &self.schema.ratio_features {
            if df.column(&ratio.numerator).is_ok() && df.column(&ratio.denominator).is_ok() {
                if let Some(series) = try_compute(&ratio.name, || self.ratio(df, ratio)) {
                    let _ = result.with_column(series);
                }
            }
        }

        result
    }

    /// Count of rows sharing the same grouping key, broadcast to each row.
    /// A null key yields a null multiplicity.
    fn multiplicity(&self, df: &DataFrame) -> Result<Series> {
        let key = df
            .column(&self.schema.group_key)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let ca = key.str()?;

        let mut counts: HashMap<&str, u32> = HashMap::new();
        for value in ca.into_iter().flatten() {
            *counts.entry(value).or_insert(0) += 1;
        }

        let values: Vec<Option<u32>> = ca
            .into_iter()
            .map(|value| value.map(|v| counts[v]))
            .collect();

        Ok(Series::new("multiplicity".into(), values))
    }

    /// (|err1| + |err2|) / (2 * |value|); a zero value or any missing
    /// operand yields null. Never negative, never infinite.
    fn relative_uncertainty(&self, df: &DataFrame, field: &FieldSchema) -> Result<Series> {
        let base = numeric_column(df, &field.name)?;
        let err1 = numeric_column(df, &field.err1_column())?;
        let err2 = numeric_column(df, &field.err2_column())?;

        let values: Vec<Option<f64>> = base
            .iter()
            .zip(err1.iter().zip(err2.iter()))
            .map(|(b, (e1, e2))| {
                let b = (*b).filter(|v| *v != 0.0)?;
                let e1 = (*e1)?;
                let e2 = (*e2)?;
                finite((e1.abs() + e2.abs()) / (2.0 * b.abs()))
            })
            .collect();

        Ok(Series::new(
            format!("relative_uncertainty_{}", field.name).into(),
            values,
        ))
    }

    /// 1 if the limit flag (null treated as 0) is nonzero, else 0.
    fn limit_flag(&self, df: &DataFrame, field: &FieldSchema) -> Result<Series> {
        let flags = numeric_column(df, &field.limit_column())?;
        let values: Vec<i32> = flags
            .iter()
            .map(|v| if v.unwrap_or(0.0) != 0.0 { 1 } else { 0 })
            .collect();

        Ok(Series::new(
            format!("is_limited_{}", field.name).into(),
            values,
        ))
    }

    /// numerator / transform(denominator); division by zero or any invalid
    /// operation yields null, never an error.
    fn ratio(&self, df: &DataFrame, feature: &RatioFeature) -> Result<Series> {
        let num = numeric_column(df, &feature.numerator)?;
        let den = numeric_column(df, &feature.denominator)?;

        let values: Vec<Option<f64>> = num
            .iter()
            .zip(den.iter())
            .map(|(n, d)| {
                let n = (*n)?;
                let d = (*d)?;
                let d = match feature.transform {
                    DenominatorTransform::Identity => d,
                    DenominatorTransform::Sqrt => d.sqrt(),
                };
                if d == 0.0 {
                    return None;
                }
                finite(n / d)
            })
            .collect();

        Ok(Series::new(feature.name.clone().into(), values))
    }

    /// Prune the engineered frame down to the numeric feature matrix.
    ///
    /// Drops the excluded columns (best-effort, missing ones ignored),
    /// non-numeric columns, and all-null columns, then extracts the matrix
    /// with nulls as NaN. `row_indices` records which original rows the
    /// samples came from and must match the frame height.
    pub fn feature_table(
        &self,
        df: &DataFrame,
        exclusions: &[String],
        row_indices: &[usize],
    ) -> Result<FeatureTable> {
        if row_indices.len() != df.height() {
            return Err(ExoSeekrError::ShapeError {
                expected: format!("{} row indices", df.height()),
                actual: format!("{}", row_indices.len()),
            });
        }

        let pruned = df.drop_many(exclusions.iter().cloned());
        let n_rows = pruned.height();

        let mut columns: Vec<String> = Vec::new();
        let mut column_data: Vec<Vec<Option<f64>>> = Vec::new();

        for col in pruned.get_columns() {
            if !col.dtype().is_numeric() {
                continue;
            }
            if col.null_count() == col.len() {
                continue;
            }
            let series = col.as_materialized_series().cast(&DataType::Float64)?;
            let values: Vec<Option<f64>> = series.f64()?.into_iter().collect();
            columns.push(col.name().to_string());
            column_data.push(values);
        }

        let n_cols = columns.len();
        let mut x = Array2::from_elem((n_rows, n_cols), f64::NAN);
        for (j, values) in column_data.iter().enumerate() {
            for (i, value) in values.iter().enumerate() {
                if let Some(v) = value {
                    x[[i, j]] = *v;
                }
            }
        }

        Ok(FeatureTable {
            x,
            columns,
            row_indices: row_indices.to_vec(),
        })
    }
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
