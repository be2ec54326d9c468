//! Survey table schema descriptor
//!
//! Which columns carry measurement error pairs, which carry limit flags,
//! which are identifiers, and which ratio features can be derived is data,
//! not code: the engineering step is driven entirely by this descriptor
//! instead of suffix string matching on column names.

use serde::{Deserialize, Serialize};

/// One measured field and the optional companion columns it ships with.
///
/// A field `x` with an error pair has `xerr1`/`xerr2` columns; a field with
/// a limit flag has an `xlim` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub has_error_pair: bool,
    pub has_limit_flag: bool,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_error_pair: true,
            has_limit_flag: true,
        }
    }

    pub fn err1_column(&self) -> String {
        format!("{}err1", self.name)
    }

    pub fn err2_column(&self) -> String {
        format!("{}err2", self.name)
    }

    pub fn limit_column(&self) -> String {
        format!("{}lim", self.name)
    }
}

/// Transform applied to the denominator of a ratio feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenominatorTransform {
    Identity,
    Sqrt,
}

/// A derived ratio feature, gated on both source columns being present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioFeature {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
    pub transform: DenominatorTransform,
}

impl RatioFeature {
    pub fn new(
        name: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
        transform: DenominatorTransform,
    ) -> Self {
        Self {
            name: name.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
            transform,
        }
    }
}

/// Full schema of an observation table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSchema {
    /// Disposition label column (ground truth annotation)
    pub label_column: String,
    /// Grouping key used for the multiplicity feature
    pub group_key: String,
    /// Identifier / bookkeeping columns, never used as features
    pub identifier_columns: Vec<String>,
    /// Measured fields with their companion-column flags
    pub fields: Vec<FieldSchema>,
    /// Derived ratio features
    pub ratio_features: Vec<RatioFeature>,
}

impl DataSchema {
    /// Schema of the TESS Objects of Interest table.
    pub fn tess() -> Self {
        let fields = [
            "pl_tranmid",
            "pl_orbper",
            "pl_trandurh",
            "pl_trandep",
            "pl_rade",
            "pl_insol",
            "pl_eqt",
            "st_tmag",
            "st_dist",
            "st_teff",
            "st_logg",
            "st_rad",
            "st_pmra",
            "st_pmdec",
        ]
        .into_iter()
        .map(FieldSchema::new)
        .collect();

        use DenominatorTransform::{Identity, Sqrt};
        let ratio_features = vec![
            RatioFeature::new("transit_snr", "pl_trandep", "pl_trandurh", Sqrt),
            RatioFeature::new("planet_star_radius_ratio", "pl_rade", "st_rad", Identity),
            RatioFeature::new("flux_temp_ratio", "pl_insol", "st_teff", Identity),
            RatioFeature::new("period_over_duration", "pl_orbper", "pl_trandurh", Identity),
            RatioFeature::new("depth_over_tmag", "pl_trandep", "st_tmag", Identity),
            RatioFeature::new("transit_shape_proxy", "pl_trandurh", "pl_orbper", Identity),
        ];

        Self {
            label_column: "tfopwg_disp".to_string(),
            group_key: "tid".to_string(),
            identifier_columns: ["toi", "tid", "rastr", "decstr", "toi_created", "rowupdate"]
                .into_iter()
                .map(String::from)
                .collect(),
            fields,
            ratio_features,
        }
    }

    /// Raw error-pair columns declared by the schema
    pub fn error_columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.has_error_pair)
            .flat_map(|f| [f.err1_column(), f.err2_column()])
            .collect()
    }

    /// Raw limit-flag columns declared by the schema
    pub fn limit_columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.has_limit_flag)
            .map(|f| f.limit_column())
            .collect()
    }

    /// Columns excluded from the feature table at training time:
    /// identifiers, the label, and every raw error/limit column (the
    /// engineered `relative_uncertainty_*` / `is_limited_*` columns replace
    /// them). Missing columns are ignored by the caller.
    pub fn training_exclusions(&self) -> Vec<String> {
        let mut cols: Vec<String> = Vec::new();
        cols.push(self.label_column.clone());
        cols.extend(self.identifier_columns.iter().cloned());
        cols.extend(self.error_columns());
        cols.extend(self.limit_columns());
        cols
    }

    /// Reduced exclusion set for inference: identifiers and the label only.
    /// Raw error/limit columns may legitimately be absent or differently
    /// shaped in prediction inputs, so they are left to numeric pruning.
    pub fn inference_exclusions(&self) -> Vec<String> {
        let mut cols: Vec<String> = Vec::new();
        cols.push(self.label_column.clone());
        cols.extend(self.identifier_columns.iter().cloned());
        cols
    }
}

impl Default for DataSchema {
    fn default() -> Self {
        Self::tess()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_companion_column_names() {
        let field = FieldSchema::new("pl_orbper");
        assert_eq!(field.err1_column(), "pl_orbpererr1");
        assert_eq!(field.err2_column(), "pl_orbpererr2");
        assert_eq!(field.limit_column(), "pl_orbperlim");
    }

    #[test]
    fn test_tess_schema_shape() {
        let schema = DataSchema::tess();
        assert_eq!(schema.label_column, "tfopwg_disp");
        assert_eq!(schema.fields.len(), 14);
        assert_eq!(schema.ratio_features.len(), 6);
        assert_eq!(schema.error_columns().len(), 28);
        assert_eq!(schema.limit_columns().len(), 14);
    }

    #[test]
    fn test_training_exclusions_cover_raw_companions() {
        let schema = DataSchema::tess();
        let excl = schema.training_exclusions();
        assert!(excl.contains(&"tfopwg_disp".to_string()));
        assert!(excl.contains(&"tid".to_string()));
        assert!(excl.contains(&"st_tefferr1".to_string()));
        assert!(excl.contains(&"pl_radelim".to_string()));
    }

    #[test]
    fn test_inference_exclusions_are_reduced() {
        let schema = DataSchema::tess();
        let excl = schema.inference_exclusions();
        assert!(excl.contains(&"toi".to_string()));
        assert!(!excl.contains(&"st_tefferr1".to_string()));
    }
}
