//! Search space definition for hyperparameter trials

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type of parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Continuous float parameter
    Float { low: f64, high: f64 },
    /// Integer parameter (inclusive bounds)
    Int { low: i64, high: i64 },
    /// Categorical parameter
    Categorical { choices: Vec<String> },
}

/// A single hyperparameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

impl Parameter {
    /// Create a float parameter
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float { low, high },
        }
    }

    /// Create an integer parameter
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Int { low, high },
        }
    }

    /// Create a categorical parameter
    pub fn categorical(name: impl Into<String>, choices: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Categorical {
                choices: choices.into_iter().map(String::from).collect(),
            },
        }
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut impl Rng) -> ParameterValue {
        match &self.param_type {
            ParameterType::Float { low, high } => {
                ParameterValue::Float(rng.gen::<f64>() * (high - low) + low)
            }
            ParameterType::Int { low, high } => ParameterValue::Int(rng.gen_range(*low..=*high)),
            ParameterType::Categorical { choices } => {
                let idx = rng.gen_range(0..choices.len());
                ParameterValue::String(choices[idx].clone())
            }
        }
    }
}

/// Sampled parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    String(String),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }
}

/// Alias for a sampled configuration
pub type TrialParams = HashMap<String, ParameterValue>;

/// Search space for hyperparameter optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    /// Create a new empty search space
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    /// Add a parameter to the search space
    pub fn add(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Add a float parameter
    pub fn float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::float(name, low, high))
    }

    /// Add an integer parameter
    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(Parameter::int(name, low, high))
    }

    /// Add a categorical parameter
    pub fn categorical(self, name: impl Into<String>, choices: Vec<&str>) -> Self {
        self.add(Parameter::categorical(name, choices))
    }

    /// Get all parameters
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Sample a random configuration
    pub fn sample(&self, rng: &mut impl Rng) -> TrialParams {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.sample(rng)))
            .collect()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_search_space_builder() {
        let space = SearchSpace::new()
            .int("n_estimators", 100, 800)
            .categorical("max_features", vec!["sqrt", "log2"])
            .float("subsample", 0.5, 1.0);
        assert_eq!(space.len(), 3);
    }

    #[test]
    fn test_int_sampling_in_bounds() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let param = Parameter::int("n", 100, 800);

        for _ in 0..100 {
            let v = param.sample(&mut rng).as_int().unwrap();
            assert!((100..=800).contains(&v));
        }
    }

    #[test]
    fn test_categorical_sampling() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let param = Parameter::categorical("max_features", vec!["sqrt", "log2"]);

        let v = param.sample(&mut rng);
        assert!(["sqrt", "log2"].contains(&v.as_string().unwrap()));
    }

    #[test]
    fn test_sample_covers_all_parameters() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let space = SearchSpace::new()
            .int("a", 0, 10)
            .categorical("b", vec!["x", "y"]);

        let params = space.sample(&mut rng);
        assert!(params.contains_key("a"));
        assert!(params.contains_key("b"));
    }
}
