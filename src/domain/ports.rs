use crate::domain::errors::ApiClientError;
use crate::domain::prediction::{FeatureRow, PostAck, PredictionResult, RaceRecord};
use async_trait::async_trait;

/// Read/write access to the race data API.
#[async_trait]
pub trait RaceDataClient: Send + Sync {
    /// Races, most recently created first, bounded by the configured maximum.
    async fn fetch_all_races(&self) -> Result<Vec<RaceRecord>, ApiClientError>;

    /// Race ids of one season in ascending round order.
    async fn fetch_season_race_ids(&self, year: i32) -> Result<Vec<i64>, ApiClientError>;

    /// Year of the most recently created race.
    async fn fetch_latest_season_year(&self) -> Result<i32, ApiClientError>;

    async fn fetch_model_input(&self, race_id: i64) -> Result<Vec<FeatureRow>, ApiClientError>;

    /// Posts one batch; every entry is tagged with `race_id`.
    async fn post_predictions(
        &self,
        race_id: i64,
        predictions: &[PredictionResult],
    ) -> Result<PostAck, ApiClientError>;
}
