//! Disposition label mapping

use crate::error::Result;
use polars::prelude::*;

/// Binary targets for the rows whose disposition label could be mapped.
///
/// `indices` are row positions in the input frame; `targets` is aligned to
/// `indices`. Rows with ambiguous or unrecognized labels appear in neither.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedLabels {
    pub indices: Vec<usize>,
    pub targets: Vec<f64>,
}

impl MappedLabels {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Map TFOPWG disposition labels to binary targets.
///
/// CP and KP (confirmed / known planet) map to 1, FP and FA (false positive
/// / false alarm) map to 0. PC and APC (candidates) are ambiguous and the
/// rows are dropped entirely, as is any unrecognized or missing label.
/// Matching is case-insensitive.
pub fn map_labels(series: &Series) -> Result<MappedLabels> {
    let labels = series.cast(&DataType::String)?;
    let labels = labels.str()?;

    let mut indices = Vec::new();
    let mut targets = Vec::new();

    for (idx, value) in labels.into_iter().enumerate() {
        let Some(raw) = value else { continue };
        let target = match raw.trim().to_uppercase().as_str() {
            "CP" | "KP" => 1.0,
            "FP" | "FA" => 0.0,
            _ => continue,
        };
        indices.push(idx);
        targets.push(target);
    }

    Ok(MappedLabels { indices, targets })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_series(values: &[&str]) -> Series {
        Series::new("tfopwg_disp".into(), values)
    }

    #[test]
    fn test_confirmed_and_false_positive_mapping() {
        let series = label_series(&["CP", "KP", "FP", "FA"]);
        let mapped = map_labels(&series).unwrap();

        assert_eq!(mapped.indices, vec![0, 1, 2, 3]);
        assert_eq!(mapped.targets, vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_ambiguous_rows_are_dropped() {
        let series = label_series(&["CP", "PC", "APC", "FP"]);
        let mapped = map_labels(&series).unwrap();

        assert_eq!(mapped.indices, vec![0, 3]);
        assert_eq!(mapped.targets, vec![1.0, 0.0]);
    }

    #[test]
    fn test_unrecognized_labels_never_appear() {
        let series = label_series(&["CP", "banana", "", "fp"]);
        let mapped = map_labels(&series).unwrap();

        assert_eq!(mapped.indices, vec![0, 3]);
        assert_eq!(mapped.targets, vec![1.0, 0.0]);
    }

    #[test]
    fn test_case_insensitive() {
        let series = label_series(&["cp", "Kp", "fA"]);
        let mapped = map_labels(&series).unwrap();

        assert_eq!(mapped.targets, vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_only_binary_targets() {
        let series = label_series(&["CP", "KP", "FP", "FA", "PC", "APC", "??"]);
        let mapped = map_labels(&series).unwrap();

        assert!(mapped.targets.iter().all(|&t| t == 0.0 || t == 1.0));
    }

    #[test]
    fn test_seven_of_ten_scenario() {
        // 4 positive, 3 negative, 3 ambiguous
        let series = label_series(&["CP", "KP", "CP", "KP", "FP", "FA", "FP", "PC", "PC", "APC"]);
        let mapped = map_labels(&series).unwrap();

        assert_eq!(mapped.len(), 7);
        assert_eq!(mapped.targets.iter().filter(|&&t| t == 1.0).count(), 4);
        assert_eq!(mapped.targets.iter().filter(|&&t| t == 0.0).count(), 3);
    }
}
