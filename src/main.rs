//! Race prediction job
//!
//! Trains a finishing-order model on historical races from the race API and
//! posts predictions for one race, one season, or the latest season. The run
//! outcome is printed to stdout as JSON; logs go to stderr.
//!
//! # Usage
//! ```sh
//! race-predictor              # latest season
//! race-predictor 2021         # season 2021 (values >= 1950)
//! race-predictor 1074         # race 1074
//! race-predictor --event '{"race_id": 1074}'
//! ```
//!
//! # Environment Variables
//! - `API_URL` - Base URL of the race API (default: http://localhost:9000)
//! - `LOG_FORMAT` - pretty, compact or json (default: pretty)
//! - `RUST_LOG` - Log filter directives (default: info)

use clap::Parser;
use race_predictor::application::handler::{UNHANDLED_REASON, event_from_target, run_handler};
use race_predictor::application::pipeline::{PipelineEvent, PipelineOutcome};
use race_predictor::config::ObservabilityEnvConfig;
use race_predictor::infrastructure::observability::init_logging;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Season (>= 1950) or race id; omit for the latest season
    target: Option<i64>,

    /// Predict a single race
    #[arg(long, conflicts_with = "target")]
    race_id: Option<i64>,

    /// Predict every race of a season
    #[arg(long, conflicts_with = "target")]
    season: Option<i32>,

    /// Raw event payload, e.g. '{"season": 2021}'
    #[arg(long, value_parser = parse_event, conflicts_with_all = ["target", "race_id", "season"])]
    event: Option<PipelineEvent>,
}

impl Args {
    fn into_event(self) -> PipelineEvent {
        if let Some(event) = self.event {
            return event;
        }
        if self.race_id.is_some() || self.season.is_some() {
            return PipelineEvent {
                race_id: self.race_id,
                season: self.season,
            };
        }
        event_from_target(self.target)
    }
}

fn parse_event(raw: &str) -> Result<PipelineEvent, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid event JSON: {}", e))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let observability = ObservabilityEnvConfig::from_env().unwrap_or_else(|e| {
        eprintln!("{:#}; falling back to default log format", e);
        ObservabilityEnvConfig::default()
    });
    if let Err(e) = init_logging(&observability) {
        eprintln!("{:#}", e);
    }

    info!("Race predictor {} starting...", env!("CARGO_PKG_VERSION"));
    let outcome = run_handler(args.into_event()).await;

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to serialise outcome: {}", e);
            println!(r#"{{"status": "error", "reason": "{}"}}"#, UNHANDLED_REASON);
        }
    }

    match outcome {
        PipelineOutcome::Error { .. } => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}
