use crate::domain::errors::ApiClientError;
use crate::domain::ports::RaceDataClient;
use crate::domain::prediction::{FeatureRow, PostAck, PredictionResult, RaceRecord};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// One recorded `post_predictions` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedBatch {
    pub race_id: i64,
    pub predictions: Vec<PredictionResult>,
}

/// In-memory race API for offline runs and tests.
#[derive(Clone, Default)]
pub struct InMemoryRaceDataClient {
    races: Vec<RaceRecord>,
    model_inputs: HashMap<i64, Vec<FeatureRow>>,
    failing_races: HashSet<i64>,
    posted: Arc<RwLock<Vec<PostedBatch>>>,
    input_requests: Arc<RwLock<Vec<i64>>>,
}

impl InMemoryRaceDataClient {
    pub fn new(races: Vec<RaceRecord>) -> Self {
        Self {
            races,
            ..Self::default()
        }
    }

    pub fn with_model_input(mut self, race_id: i64, rows: Vec<FeatureRow>) -> Self {
        self.model_inputs.insert(race_id, rows);
        self
    }

    /// Model-input requests for `race_id` answer with HTTP 500.
    pub fn with_failing_race(mut self, race_id: i64) -> Self {
        self.failing_races.insert(race_id);
        self
    }

    pub async fn posted(&self) -> Vec<PostedBatch> {
        self.posted.read().await.clone()
    }

    /// Race ids passed to `fetch_model_input`, in call order.
    pub async fn input_requests(&self) -> Vec<i64> {
        self.input_requests.read().await.clone()
    }
}

#[async_trait]
impl RaceDataClient for InMemoryRaceDataClient {
    async fn fetch_all_races(&self) -> Result<Vec<RaceRecord>, ApiClientError> {
        let mut races = self.races.clone();
        races.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(races)
    }

    async fn fetch_season_race_ids(&self, year: i32) -> Result<Vec<i64>, ApiClientError> {
        let mut season: Vec<&RaceRecord> = self.races.iter().filter(|r| r.year == year).collect();
        season.sort_by_key(|r| r.round.unwrap_or(0));
        Ok(season.into_iter().map(|r| r.id).collect())
    }

    async fn fetch_latest_season_year(&self) -> Result<i32, ApiClientError> {
        self.races
            .iter()
            .max_by_key(|r| r.id)
            .map(|r| r.year)
            .ok_or(ApiClientError::NoRaces)
    }

    async fn fetch_model_input(&self, race_id: i64) -> Result<Vec<FeatureRow>, ApiClientError> {
        self.input_requests.write().await.push(race_id);
        if self.failing_races.contains(&race_id) {
            return Err(ApiClientError::Status {
                url: format!("memory:///predictions/model-input/{}", race_id),
                status: 500,
                body: "Internal Server Error".to_string(),
            });
        }
        Ok(self.model_inputs.get(&race_id).cloned().unwrap_or_default())
    }

    async fn post_predictions(
        &self,
        race_id: i64,
        predictions: &[PredictionResult],
    ) -> Result<PostAck, ApiClientError> {
        info!(
            "InMemoryRaceDataClient: Recorded {} predictions for race {}",
            predictions.len(),
            race_id
        );
        self.posted.write().await.push(PostedBatch {
            race_id,
            predictions: predictions.to_vec(),
        });
        Ok(PostAck {
            status: "ok".to_string(),
            count: predictions.len(),
        })
    }
}
