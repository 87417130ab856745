//! Configuration module for the race prediction job.
//!
//! Every setting is read from environment variables once at process start,
//! organized by concern: API access and training-set limits, and model
//! hyperparameters. `LOG_FORMAT` is read by the binary on its own
//! (see [`ObservabilityEnvConfig`]) and is not part of [`Config`].

mod model_config;
mod observability_config;
mod pipeline_config;

pub use model_config::ModelConfig;
pub use observability_config::{LogFormat, ObservabilityEnvConfig};
pub use pipeline_config::PipelineConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub model: ModelConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            pipeline: PipelineConfig::from_lookup(&lookup)
                .context("Failed to load pipeline config")?,
            model: ModelConfig::from_lookup(&lookup).context("Failed to load model config")?,
        })
    }
}

/// Parses `key` when set, `default` otherwise. A set but malformed value is an error.
pub(crate) fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Failed to parse {} (got '{}')", key, raw)),
        None => Ok(default),
    }
}
