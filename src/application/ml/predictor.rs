use crate::domain::errors::PredictorError;
use crate::domain::prediction::{FeatureRow, PredictionResult};

/// Fit diagnostics of one training call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingReport {
    pub rows: usize,
    /// In-sample root mean squared error, in finishing positions.
    pub rmse: f64,
    /// In-sample mean absolute error, in finishing positions.
    pub mae: f64,
}

/// Interface for finishing-order models
pub trait RacePredictor: Send + Sync {
    /// Fit on historical rows; every row must carry `actual_position`.
    /// Replaces any previously trained state.
    fn train(&mut self, rows: &[FeatureRow]) -> Result<TrainingReport, PredictorError>;

    /// One result per row, in input order, with positions 1..=N.
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<PredictionResult>, PredictorError>;

    fn is_trained(&self) -> bool;

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version tag
    fn version(&self) -> &str;
}
