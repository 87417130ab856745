//! Model hyperparameters parsed from environment variables.

use super::parse_var;
use crate::domain::ml::feature_registry::default_feature_columns;
use anyhow::{Result, ensure};

/// Feature layout, boosting hyperparameters and the version tag stamped on
/// every prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub feature_columns: Vec<String>,
    pub n_estimators: usize,
    pub max_depth: u16,
    pub learning_rate: f64,
    pub random_state: u64,
    /// Fraction of rows drawn for each boosting stage; 1.0 uses every row.
    pub subsample: f64,
    pub version: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            feature_columns: default_feature_columns(),
            n_estimators: 200,
            max_depth: 4,
            learning_rate: 0.1,
            random_state: 42,
            subsample: 1.0,
            version: "gbr-v1".to_string(),
        }
    }
}

impl ModelConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let feature_columns = match lookup("MODEL_FEATURE_COLUMNS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.feature_columns,
        };

        let config = Self {
            feature_columns,
            n_estimators: parse_var(lookup, "MODEL_N_ESTIMATORS", defaults.n_estimators)?,
            max_depth: parse_var(lookup, "MODEL_MAX_DEPTH", defaults.max_depth)?,
            learning_rate: parse_var(lookup, "MODEL_LEARNING_RATE", defaults.learning_rate)?,
            random_state: parse_var(lookup, "MODEL_RANDOM_STATE", defaults.random_state)?,
            subsample: parse_var(lookup, "MODEL_SUBSAMPLE", defaults.subsample)?,
            version: lookup("MODEL_VERSION").unwrap_or(defaults.version),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.feature_columns.is_empty(), "MODEL_FEATURE_COLUMNS must not be empty");
        ensure!(self.n_estimators > 0, "MODEL_N_ESTIMATORS must be positive");
        ensure!(self.max_depth > 0, "MODEL_MAX_DEPTH must be positive");
        ensure!(
            self.learning_rate > 0.0 && self.learning_rate.is_finite(),
            "MODEL_LEARNING_RATE must be a positive number"
        );
        ensure!(
            self.subsample > 0.0 && self.subsample <= 1.0,
            "MODEL_SUBSAMPLE must be in (0, 1]"
        );
        Ok(())
    }
}
