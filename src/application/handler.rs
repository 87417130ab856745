//! Entry point of the prediction job.
//!
//! Wires configuration, the HTTP client and a fresh predictor together, runs
//! the pipeline, and folds every failure into a structured outcome so the
//! caller never sees a raw error or panic.

use crate::application::ml::SmartCoreRacePredictor;
use crate::application::pipeline::{PipelineEvent, PipelineOutcome, PredictionPipeline};
use crate::config::Config;
use crate::infrastructure::api_client::HttpRaceDataClient;
use std::sync::Arc;
use tracing::{error, info};

/// Reason reported for every failed run; details go to the logs.
pub const UNHANDLED_REASON: &str = "Unhandled exception (see logs)";

/// Bare numeric targets from this year on are seasons, below it race ids.
pub const FIRST_SEASON: i64 = 1950;

/// Maps a bare command-line target to an event. Absent or zero means the latest season.
pub fn event_from_target(target: Option<i64>) -> PipelineEvent {
    match target {
        Some(t) if t >= FIRST_SEASON => match i32::try_from(t) {
            Ok(season) => PipelineEvent::season(season),
            Err(_) => PipelineEvent::race(t),
        },
        Some(t) if t != 0 => PipelineEvent::race(t),
        _ => PipelineEvent::default(),
    }
}

/// Loads configuration from the environment and runs the job.
pub async fn run_handler(event: PipelineEvent) -> PipelineOutcome {
    match Config::from_env() {
        Ok(config) => run_with_config(event, &config).await,
        Err(e) => {
            error!("Prediction pipeline failed: {:?}", e);
            PipelineOutcome::Error {
                reason: UNHANDLED_REASON.to_string(),
            }
        }
    }
}

/// Builds a pipeline against the configured API and runs it.
pub async fn run_with_config(event: PipelineEvent, config: &Config) -> PipelineOutcome {
    info!(
        "Starting prediction run: api={}, model={}, event={:?}",
        config.pipeline.api_url, config.model.version, event
    );
    let api = Arc::new(HttpRaceDataClient::new(&config.pipeline));
    let predictor = Box::new(SmartCoreRacePredictor::new(config.model.clone()));
    let pipeline = PredictionPipeline::new(api, predictor, config.pipeline.clone());
    execute(pipeline, event).await
}

/// Runs `pipeline` on its own task; errors and panics both become `status: error`.
pub async fn execute(mut pipeline: PredictionPipeline, event: PipelineEvent) -> PipelineOutcome {
    let task = tokio::spawn(async move { pipeline.run(event).await });

    match task.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            error!("Prediction pipeline failed: {:?}", e);
            PipelineOutcome::Error {
                reason: UNHANDLED_REASON.to_string(),
            }
        }
        Err(join_error) => {
            error!("Prediction pipeline aborted: {}", join_error);
            PipelineOutcome::Error {
                reason: UNHANDLED_REASON.to_string(),
            }
        }
    }
}
