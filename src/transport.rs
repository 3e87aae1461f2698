//! HTTP transport shared by every scraper.
//!
//! The [`Transport`] trait is the seam between scrapers and the network. Scrapers
//! receive a `&dyn Transport`, so the same parsing code runs against the real
//! [`HttpClient`] and against canned responses in tests.
//!
//! # Retry Strategy
//!
//! - Retries only on status 429, 500, 502, 503 and 504
//! - At most `max_retries` extra attempts
//! - Linear backoff: attempt `n` waits `n * backoff` plus 0-250ms of jitter
//! - Network-level failures (DNS, reset, timeout) are returned immediately
//!
//! Whatever goes wrong, the caller gets a [`FetchError`] rather than a panic.

use crate::config::CrawlerConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use rand::{Rng, rng};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Status codes worth another attempt.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// A successful (2xx) response body.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub body: String,
}

/// Minimal HTTP surface used by the scrapers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Page, FetchError>;

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<Page, FetchError>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    backoff: Duration,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl HttpClient {
    /// Build the client once per run.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the user agent, connect/read timeouts, retry
    ///   count and backoff step
    ///
    /// # Returns
    ///
    /// The client, or [`FetchError::Client`] if the user agent is not a valid
    /// header value or the TLS backend cannot be initialized.
    pub fn new(config: &CrawlerConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| FetchError::Client(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, agent);

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff: config.backoff(),
        })
    }

    /// Delay before retry number `attempt` (1-based).
    fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms: u64 = rng().random_range(0..=250);
        self.backoff.saturating_mul(attempt) + Duration::from_millis(jitter_ms)
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Page, FetchError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            let response = build().send().await.map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;
            let status = response.status();

            if status.is_success() {
                let body = response.text().await.map_err(|source| FetchError::Network {
                    url: url.to_string(),
                    source,
                })?;
                debug!(
                    %url,
                    bytes = body.len(),
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    "Fetched"
                );
                return Ok(Page {
                    url: url.to_string(),
                    body,
                });
            }

            let code = status.as_u16();
            if !is_retryable(code) || attempt >= self.max_retries {
                warn!(%url, status = code, attempt, "Request gave up");
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: code,
                });
            }

            attempt += 1;
            let delay = self.delay_for(attempt);
            warn!(
                %url,
                status = code,
                attempt,
                max = self.max_retries,
                ?delay,
                "Transient status; backing off"
            );
            sleep(delay).await;
        }
    }
}

pub fn is_retryable(status: u16) -> bool {
    RETRY_STATUSES.contains(&status)
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(level = "debug", skip(self, headers))]
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Page, FetchError> {
        self.send_with_retry(url, || {
            headers
                .iter()
                .fold(self.client.get(url), |req, (k, v)| req.header(*k, *v))
        })
        .await
    }

    #[instrument(level = "debug", skip(self, body, headers))]
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<Page, FetchError> {
        self.send_with_retry(url, || {
            headers
                .iter()
                .fold(self.client.post(url).json(body), |req, (k, v)| {
                    req.header(*k, *v)
                })
        })
        .await
    }
}
