use crate::domain::errors::ApiClientError;
use reqwest::{Client, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    RetryTransientMiddleware, Retryable, RetryableStrategy, default_on_request_failure,
    policies::ExponentialBackoff,
};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Total attempts per call, the first one included.
pub const MAX_ATTEMPTS: u32 = 3;

/// Statuses worth another attempt; every other failure status is final.
pub const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates a new HTTP client with retry middleware
    pub fn create_client(timeout: Duration) -> ClientWithMiddleware {
        Self::create_client_with_backoff(timeout, Duration::from_secs(1), Duration::from_secs(8))
    }

    /// Same as [`HttpClientFactory::create_client`] with explicit backoff bounds.
    pub fn create_client_with_backoff(
        timeout: Duration,
        min_backoff: Duration,
        max_backoff: Duration,
    ) -> ClientWithMiddleware {
        // Retry policy:
        // - Exponential backoff between min and max
        // - MAX_ATTEMPTS - 1 retries after the first attempt
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(min_backoff, max_backoff)
            .build_with_max_retries(MAX_ATTEMPTS - 1);

        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    "HttpClientFactory: client builder failed ({}), using defaults without a {:?} timeout",
                    e, timeout
                );
                Client::new()
            });

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                retry_policy,
                StatusForcelist,
            ))
            .build()
    }
}

/// Retries transport failures and the statuses in [`RETRYABLE_STATUSES`].
pub struct StatusForcelist;

impl RetryableStrategy for StatusForcelist {
    fn handle(&self, res: &Result<Response, reqwest_middleware::Error>) -> Option<Retryable> {
        match res {
            Ok(response) => classify_status(response.status()),
            Err(error) => default_on_request_failure(error),
        }
    }
}

pub fn classify_status(status: StatusCode) -> Option<Retryable> {
    if status.is_success() {
        None
    } else if RETRYABLE_STATUSES.contains(&status.as_u16()) {
        Some(Retryable::Transient)
    } else {
        Some(Retryable::Fatal)
    }
}

/// Joins `path` onto `base_url` and appends URL-encoded query parameters.
/// reqwest-middleware's request builder does not expose `.query()`, so the
/// query string is built up front.
pub fn build_url_with_query<K, V>(
    base_url: &str,
    path: &str,
    params: &[(K, V)],
) -> Result<String, ApiClientError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let raw = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw).map_err(|e| ApiClientError::InvalidUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;

    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k.as_ref(), v.as_ref());
        }
    }

    Ok(url.into())
}
