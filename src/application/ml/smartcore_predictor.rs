use super::gradient_boosting::{BoostingParameters, GradientBoostingRegressor};
use super::predictor::{RacePredictor, TrainingReport};
use crate::config::ModelConfig;
use crate::domain::errors::PredictorError;
use crate::domain::ml::feature_registry::{TARGET_COLUMN, build_feature_matrix};
use crate::domain::ml::ranking::{compute_confidences, rank_to_positions};
use crate::domain::prediction::{FeatureRow, PredictionResult};
use tracing::{debug, info};

/// Finishing-order predictor backed by a gradient-boosted smartcore tree ensemble.
pub struct SmartCoreRacePredictor {
    config: ModelConfig,
    model: Option<GradientBoostingRegressor>,
}

impl SmartCoreRacePredictor {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn boosting_parameters(&self) -> BoostingParameters {
        BoostingParameters {
            n_estimators: self.config.n_estimators,
            max_depth: self.config.max_depth,
            learning_rate: self.config.learning_rate,
            subsample: self.config.subsample,
            seed: self.config.random_state,
        }
    }

    fn targets(rows: &[FeatureRow]) -> Result<Vec<f64>, PredictorError> {
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                row.number(TARGET_COLUMN)
                    .ok_or_else(|| PredictorError::MissingField {
                        index,
                        field: TARGET_COLUMN.to_string(),
                    })
            })
            .collect()
    }
}

impl RacePredictor for SmartCoreRacePredictor {
    fn train(&mut self, rows: &[FeatureRow]) -> Result<TrainingReport, PredictorError> {
        if rows.is_empty() {
            return Err(PredictorError::EmptyTrainingSet);
        }

        let x = build_feature_matrix(rows, &self.config.feature_columns);
        let y = Self::targets(rows)?;

        info!(
            "Training gradient boosting regressor (Stages: {}, Depth: {}, LR: {}, Rows: {})",
            self.config.n_estimators,
            self.config.max_depth,
            self.config.learning_rate,
            rows.len()
        );
        let model = GradientBoostingRegressor::fit(&x, &y, &self.boosting_parameters())?;

        let fitted = model.predict(&x)?;
        let n = y.len() as f64;
        let sq_err: f64 = fitted.iter().zip(&y).map(|(p, t)| (p - t).powi(2)).sum();
        let abs_err: f64 = fitted.iter().zip(&y).map(|(p, t)| (p - t).abs()).sum();
        let report = TrainingReport {
            rows: rows.len(),
            rmse: (sq_err / n).sqrt(),
            mae: abs_err / n,
        };

        self.model = Some(model);
        Ok(report)
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<PredictionResult>, PredictorError> {
        let model = self.model.as_ref().ok_or(PredictorError::NotTrained)?;

        let x = build_feature_matrix(rows, &self.config.feature_columns);
        let scores = model.predict(&x)?;
        let positions = rank_to_positions(&scores);
        let confidences = compute_confidences(&scores, &positions);
        debug!("Scored {} rows: {:?}", rows.len(), scores);

        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let driver_id = row.driver_id().ok_or_else(|| PredictorError::MissingField {
                    index,
                    field: "driver_id".to_string(),
                })?;
                Ok(PredictionResult::from_row(
                    driver_id,
                    row,
                    positions[index],
                    confidences[index],
                    &self.config.version,
                ))
            })
            .collect()
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    fn name(&self) -> &str {
        "SmartCore Gradient Boosting"
    }

    fn version(&self) -> &str {
        &self.config.version
    }
}
