//! HTTP client for the race data API.
//!
//! Wraps the list/filter/sort conventions of `GET /races`, the model-input
//! endpoint and the batch `POST /predictions`. Every request goes through the
//! retrying client from [`HttpClientFactory`].

use crate::config::PipelineConfig;
use crate::domain::errors::ApiClientError;
use crate::domain::ports::RaceDataClient;
use crate::domain::prediction::{
    FeatureRow, PostAck, PredictionBatch, PredictionResult, RaceRecord,
};
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use async_trait::async_trait;
use reqwest::Response;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Upper bound on races requested for a single season.
const SEASON_RACE_LIMIT: usize = 100;

pub struct HttpRaceDataClient {
    client: ClientWithMiddleware,
    base_url: String,
    max_races_to_fetch: usize,
}

impl HttpRaceDataClient {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_client(config, HttpClientFactory::create_client(config.request_timeout))
    }

    pub fn with_client(config: &PipelineConfig, client: ClientWithMiddleware) -> Self {
        Self {
            client,
            base_url: config.api_url.clone(),
            max_races_to_fetch: config.max_races_to_fetch,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /races` with the list parameters the API understands.
    pub fn races_url(&self, query: &RaceQuery) -> Result<String, ApiClientError> {
        build_url_with_query(&self.base_url, "/races", &query.params())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiClientError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ApiClientError::Transport {
                url: url.to_string(),
                source,
            })?;
        decode(url, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiClientError> {
        debug!("POST {}", url);
        let payload = serde_json::to_vec(body).map_err(|e| ApiClientError::Encode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|source| ApiClientError::Transport {
                url: url.to_string(),
                source,
            })?;
        decode(url, response).await
    }

    async fn fetch_races(&self, query: &RaceQuery) -> Result<Vec<RaceRecord>, ApiClientError> {
        let url = self.races_url(query)?;
        self.get_json(&url).await
    }
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiClientError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await.map_err(|e| ApiClientError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ApiClientError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// List parameters for `GET /races`, serialized as the JSON-in-query
/// conventions of the API (`sort=["id","DESC"]`, `range=[0,9]`, `filter={"year": 2020}`).
#[derive(Debug, Clone, PartialEq)]
pub struct RaceQuery {
    pub filter_year: Option<i32>,
    pub sort_field: &'static str,
    pub descending: bool,
    /// Inclusive index range.
    pub range: (usize, usize),
}

impl RaceQuery {
    /// Most recently created races first.
    pub fn latest(count: usize) -> Self {
        Self {
            filter_year: None,
            sort_field: "id",
            descending: true,
            range: (0, count.saturating_sub(1)),
        }
    }

    /// One season in round order.
    pub fn season(year: i32) -> Self {
        Self {
            filter_year: Some(year),
            sort_field: "round",
            descending: false,
            range: (0, SEASON_RACE_LIMIT - 1),
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(year) = self.filter_year {
            params.push(("filter", format!(r#"{{"year": {}}}"#, year)));
        }
        let direction = if self.descending { "DESC" } else { "ASC" };
        params.push(("sort", format!(r#"["{}","{}"]"#, self.sort_field, direction)));
        params.push(("range", format!("[{},{}]", self.range.0, self.range.1)));
        params
    }
}

#[async_trait]
impl RaceDataClient for HttpRaceDataClient {
    async fn fetch_all_races(&self) -> Result<Vec<RaceRecord>, ApiClientError> {
        self.fetch_races(&RaceQuery::latest(self.max_races_to_fetch))
            .await
    }

    async fn fetch_season_race_ids(&self, year: i32) -> Result<Vec<i64>, ApiClientError> {
        let races = self.fetch_races(&RaceQuery::season(year)).await?;
        Ok(races.into_iter().map(|r| r.id).collect())
    }

    async fn fetch_latest_season_year(&self) -> Result<i32, ApiClientError> {
        let races = self.fetch_races(&RaceQuery::latest(1)).await?;
        races
            .first()
            .map(|race| race.year)
            .ok_or(ApiClientError::NoRaces)
    }

    async fn fetch_model_input(&self, race_id: i64) -> Result<Vec<FeatureRow>, ApiClientError> {
        let params: [(&str, &str); 0] = [];
        let url = build_url_with_query(
            &self.base_url,
            &format!("/predictions/model-input/{}", race_id),
            &params,
        )?;
        self.get_json(&url).await
    }

    async fn post_predictions(
        &self,
        race_id: i64,
        predictions: &[PredictionResult],
    ) -> Result<PostAck, ApiClientError> {
        let params: [(&str, &str); 0] = [];
        let url = build_url_with_query(&self.base_url, "/predictions", &params)?;
        let batch = PredictionBatch::for_race(race_id, predictions);
        self.post_json(&url, &batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::core::http_client_factory::MAX_ATTEMPTS;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn client() -> HttpRaceDataClient {
        let config = PipelineConfig {
            api_url: "http://localhost:9000".to_string(),
            max_races_to_fetch: 1000,
            ..PipelineConfig::default()
        };
        HttpRaceDataClient::new(&config)
    }

    #[test]
    fn test_latest_query_params() {
        let params = RaceQuery::latest(1000).params();
        assert_eq!(
            params,
            vec![
                ("sort", r#"["id","DESC"]"#.to_string()),
                ("range", "[0,999]".to_string()),
            ]
        );
    }

    #[test]
    fn test_latest_single_race_range() {
        assert_eq!(RaceQuery::latest(1).range, (0, 0));
    }

    #[test]
    fn test_season_query_params() {
        let params = RaceQuery::season(2020).params();
        assert_eq!(
            params,
            vec![
                ("filter", r#"{"year": 2020}"#.to_string()),
                ("sort", r#"["round","ASC"]"#.to_string()),
                ("range", "[0,99]".to_string()),
            ]
        );
    }

    #[test]
    fn test_races_url_is_encoded() {
        let url = client().races_url(&RaceQuery::season(2021)).unwrap();
        assert!(url.starts_with("http://localhost:9000/races?filter="));
        assert!(url.contains("sort=%5B%22round%22%2C%22ASC%22%5D"));
        assert!(!url.contains('"'));
    }

    /// Reads one request (headers plus `Content-Length` body).
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Local API answering every request with `status` and `body`, or never
    /// answering when `status` is `None`. Returns the base URL and a request counter.
    async fn spawn_stub(status: Option<u16>, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    let Some(status) = status else {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        return;
                    };
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn stub_client(base_url: &str, timeout: Duration) -> HttpRaceDataClient {
        let config = PipelineConfig {
            api_url: base_url.to_string(),
            request_timeout: timeout,
            ..PipelineConfig::default()
        };
        let http = HttpClientFactory::create_client_with_backoff(
            timeout,
            Duration::from_millis(1),
            Duration::from_millis(5),
        );
        HttpRaceDataClient::with_client(&config, http)
    }

    fn sample_prediction() -> PredictionResult {
        PredictionResult {
            driver_id: 1,
            constructor_id: Some(1),
            grid: Some(2),
            predicted_position: 1,
            actual_position: None,
            predicted_delta: Some(1),
            actual_delta: None,
            confidence: 1.0,
            model_version: "gbr-v1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_transient_status_is_retried_up_to_budget() {
        let (url, hits) = spawn_stub(Some(503), "{}").await;
        let api = stub_client(&url, Duration::from_secs(5));

        let err = api.fetch_model_input(101).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_ATTEMPTS as usize);

        let err = api
            .post_predictions(101, &[sample_prediction()])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(hits.load(Ordering::SeqCst), 2 * MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let (url, hits) = spawn_stub(Some(429), "{}").await;
        let api = stub_client(&url, Duration::from_secs(5));

        let err = api.fetch_all_races().await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn test_client_error_is_final() {
        let (url, hits) = spawn_stub(Some(404), r#"{"detail":"not found"}"#).await;
        let api = stub_client(&url, Duration::from_secs(5));

        let err = api.fetch_model_input(101).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let err = api
            .post_predictions(101, &[sample_prediction()])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_success_takes_one_attempt() {
        let (url, hits) = spawn_stub(Some(200), r#"{"status":"ok","count":1}"#).await;
        let api = stub_client(&url, Duration::from_secs(5));

        let ack = api
            .post_predictions(101, &[sample_prediction()])
            .await
            .unwrap();
        assert_eq!(ack.status, "ok");
        assert_eq!(ack.count, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_not_retried() {
        let (url, hits) = spawn_stub(Some(200), "not json").await;
        let api = stub_client(&url, Duration::from_secs(5));

        let err = api.fetch_model_input(101).await.unwrap_err();
        assert!(matches!(err, ApiClientError::Decode { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_timeout_bounds_each_attempt() {
        let (url, hits) = spawn_stub(None, "").await;
        let api = stub_client(&url, Duration::from_millis(200));

        let started = Instant::now();
        let err = api.fetch_model_input(101).await.unwrap_err();
        assert!(matches!(err, ApiClientError::Transport { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_ATTEMPTS as usize);
    }
}
