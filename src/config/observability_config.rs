//! Observability configuration parsing from environment variables.
//!
//! The job only logs; `RUST_LOG` drives filtering and `LOG_FORMAT` the layout.

use anyhow::Result;
use std::str::FromStr;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// JSON lines for log collectors.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!(
                "Invalid LOG_FORMAT: {}. Must be 'pretty', 'compact', or 'json'",
                s
            ),
        }
    }
}

/// Observability environment configuration
#[derive(Debug, Clone, Default)]
pub struct ObservabilityEnvConfig {
    pub log_format: LogFormat,
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => LogFormat::from_str(&raw)?,
            None => LogFormat::default(),
        };
        Ok(Self { log_format })
    }
}
