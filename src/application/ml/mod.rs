pub mod gradient_boosting;
pub mod predictor;
pub mod smartcore_predictor;

pub use predictor::{RacePredictor, TrainingReport};
pub use smartcore_predictor::SmartCoreRacePredictor;
