use thiserror::Error;

/// Errors raised while talking to the race data API
#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest_middleware::Error,
    },

    #[error("Request to {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Failed to encode request body for {url}: {reason}")]
    Encode { url: String, reason: String },

    #[error("Invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("No races available to resolve the latest season")]
    NoRaces,
}

impl ApiClientError {
    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors related to model training and inference
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Model has not been trained. Call train() first.")]
    NotTrained,

    #[error("Cannot train on an empty training set")]
    EmptyTrainingSet,

    #[error("Row {index} is missing required field '{field}'")]
    MissingField { index: usize, field: String },

    #[error("Feature matrix construction failed: {reason}")]
    Matrix { reason: String },

    #[error("Regressor failure: {reason}")]
    Model { reason: String },
}
