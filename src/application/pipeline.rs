//! Prediction pipeline: one run trains a fresh model and publishes
//! predictions for a scope of races.
//!
//! A run moves through four stages, strictly in sequence:
//! 1. resolve the race scope from the event (single race, season, latest season)
//! 2. assemble historical training rows, excluding the scope
//! 3. train once on the aggregate
//! 4. predict and post each race of the scope in order

use crate::application::ml::RacePredictor;
use crate::config::PipelineConfig;
use crate::domain::ports::RaceDataClient;
use crate::domain::prediction::FeatureRow;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

pub const INSUFFICIENT_TRAINING_DATA: &str = "Insufficient training data";

/// Trigger payload. `race_id` takes precedence over `season`; neither means
/// the latest season.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEvent {
    #[serde(default)]
    pub race_id: Option<i64>,
    #[serde(default)]
    pub season: Option<i32>,
}

impl PipelineEvent {
    pub fn race(race_id: i64) -> Self {
        Self {
            race_id: Some(race_id),
            season: None,
        }
    }

    pub fn season(season: i32) -> Self {
        Self {
            race_id: None,
            season: Some(season),
        }
    }
}

/// Structured result of a run. Callers branch on `status` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineOutcome {
    Ok {
        season: Option<i32>,
        races: usize,
        predictions_count: usize,
    },
    Skip {
        reason: String,
    },
    Error {
        reason: String,
    },
}

impl PipelineOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            PipelineOutcome::Ok { .. } => "ok",
            PipelineOutcome::Skip { .. } => "skip",
            PipelineOutcome::Error { .. } => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PipelineOutcome::Error { .. })
    }
}

/// Races a run will generate predictions for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceScope {
    pub season: Option<i32>,
    pub race_ids: Vec<i64>,
}

pub struct PredictionPipeline {
    api: Arc<dyn RaceDataClient>,
    predictor: Box<dyn RacePredictor>,
    config: PipelineConfig,
}

impl PredictionPipeline {
    pub fn new(
        api: Arc<dyn RaceDataClient>,
        predictor: Box<dyn RacePredictor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            api,
            predictor,
            config,
        }
    }

    pub fn predictor(&self) -> &dyn RacePredictor {
        self.predictor.as_ref()
    }

    pub async fn run(&mut self, event: PipelineEvent) -> Result<PipelineOutcome> {
        let scope = self.resolve_scope(event).await?;
        if event.race_id.is_none() {
            info!(
                "Predicting season {:?} ({} races)",
                scope.season,
                scope.race_ids.len()
            );
        }

        let training_rows = self.fetch_training_rows(&scope.race_ids).await?;
        if training_rows.len() < self.config.min_training_rows {
            warn!(
                "Skipping run: {} training rows, {} required",
                training_rows.len(),
                self.config.min_training_rows
            );
            return Ok(PipelineOutcome::Skip {
                reason: INSUFFICIENT_TRAINING_DATA.to_string(),
            });
        }

        info!("Training on {} rows", training_rows.len());
        let report = self
            .predictor
            .train(&training_rows)
            .context("Model training failed")?;
        info!(
            "Model {} trained: rows={}, RMSE={:.4}, MAE={:.4}",
            self.predictor.version(),
            report.rows,
            report.rmse,
            report.mae
        );

        let mut total = 0;
        for &race_id in &scope.race_ids {
            total += self.predict_and_post(race_id).await?;
        }

        info!(
            "Done: {} predictions across {} races",
            total,
            scope.race_ids.len()
        );
        Ok(PipelineOutcome::Ok {
            season: scope.season,
            races: scope.race_ids.len(),
            predictions_count: total,
        })
    }

    pub async fn resolve_scope(&self, event: PipelineEvent) -> Result<RaceScope> {
        if let Some(race_id) = event.race_id {
            return Ok(RaceScope {
                season: event.season,
                race_ids: vec![race_id],
            });
        }

        let season = match event.season {
            Some(season) => season,
            None => self
                .api
                .fetch_latest_season_year()
                .await
                .context("Failed to resolve latest season")?,
        };
        let race_ids = self
            .api
            .fetch_season_race_ids(season)
            .await
            .with_context(|| format!("Failed to fetch races of season {}", season))?;

        Ok(RaceScope {
            season: Some(season),
            race_ids,
        })
    }

    /// Rows with a known finishing position from every eligible race.
    /// Races whose input cannot be fetched are logged and left out.
    pub async fn fetch_training_rows(&self, exclude_race_ids: &[i64]) -> Result<Vec<FeatureRow>> {
        let excluded: HashSet<i64> = exclude_race_ids.iter().copied().collect();
        let races = self
            .api
            .fetch_all_races()
            .await
            .context("Failed to fetch race list")?;

        let eligible: Vec<_> = races
            .into_iter()
            .filter(|r| r.year >= self.config.min_training_year && !excluded.contains(&r.id))
            .collect();
        info!(
            "{} races eligible for training (year >= {}, {} excluded)",
            eligible.len(),
            self.config.min_training_year,
            excluded.len()
        );

        let mut all_rows = Vec::new();
        let mut unlabeled = 0usize;
        let mut failed = 0usize;
        for race in &eligible {
            match self.api.fetch_model_input(race.id).await {
                Ok(rows) => {
                    let fetched = rows.len();
                    let before = all_rows.len();
                    all_rows.extend(rows.into_iter().filter(FeatureRow::has_outcome));
                    unlabeled += fetched - (all_rows.len() - before);
                }
                Err(e) => {
                    failed += 1;
                    warn!("Failed to fetch model input for race {}: {}", race.id, e);
                }
            }
        }
        if unlabeled > 0 || failed > 0 {
            info!(
                "Training set: dropped {} rows without a finishing position, skipped {} races",
                unlabeled, failed
            );
        }
        Ok(all_rows)
    }

    /// Number of predictions posted for `race_id`; 0 when the race has no input rows.
    async fn predict_and_post(&self, race_id: i64) -> Result<usize> {
        let target_rows = self
            .api
            .fetch_model_input(race_id)
            .await
            .with_context(|| format!("Failed to fetch model input for race {}", race_id))?;
        if target_rows.is_empty() {
            warn!("Skipping race {}: no data", race_id);
            return Ok(0);
        }

        info!("Predicting race {} ({} drivers)", race_id, target_rows.len());
        let predictions = self
            .predictor
            .predict(&target_rows)
            .with_context(|| format!("Prediction failed for race {}", race_id))?;
        let ack = self
            .api
            .post_predictions(race_id, &predictions)
            .await
            .with_context(|| format!("Failed to post predictions for race {}", race_id))?;
        info!(
            "Posted {} predictions for race {} (status={}, count={})",
            predictions.len(),
            race_id,
            ack.status,
            ack.count
        );
        Ok(predictions.len())
    }
}
