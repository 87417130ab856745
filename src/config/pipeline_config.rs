//! Pipeline settings parsed from environment variables.
//!
//! Covers where the race API lives, how much history is scanned, and how
//! much of it is required before a model is trained.

use super::parse_var;
use anyhow::{Result, ensure};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:9000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub api_url: String,
    pub min_training_year: i32,
    pub min_training_rows: usize,
    pub max_races_to_fetch: usize,
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            min_training_year: 2015,
            min_training_rows: 50,
            max_races_to_fetch: 1000,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let config = Self {
            api_url,
            min_training_year: parse_var(lookup, "MIN_TRAINING_YEAR", defaults.min_training_year)?,
            min_training_rows: parse_var(lookup, "MIN_TRAINING_ROWS", defaults.min_training_rows)?,
            max_races_to_fetch: parse_var(
                lookup,
                "MAX_RACES_TO_FETCH",
                defaults.max_races_to_fetch,
            )?,
            request_timeout: Duration::from_secs(parse_var(
                lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
        };

        ensure!(!config.api_url.is_empty(), "API_URL must not be empty");
        ensure!(config.max_races_to_fetch > 0, "MAX_RACES_TO_FETCH must be positive");
        ensure!(
            !config.request_timeout.is_zero(),
            "REQUEST_TIMEOUT_SECS must be positive"
        );
        Ok(config)
    }
}
