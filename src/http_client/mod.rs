//! Rate-limited HTTP client.
//!
//! Every outbound request passes through the shared [`RateLimiter`] before it
//! reaches the network. The client never retries on its own: discovery aborts
//! a page on failure while downloads record the failure and move on, so retry
//! policy belongs to the caller.

mod response;

pub use response::HttpResponse;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::rate_limit::RateLimiter;

/// Errors from a single fetch. Never fatal to a batch; each caller decides
/// whether to skip, stop paginating, or mark a record failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (connection error, timeout).
    #[error("transient network failure: {0}")]
    Transient(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    /// The response body broke while being consumed.
    #[error("interrupted body stream: {0}")]
    Interrupted(String),
}

/// The fetch seam the crawler and downloader consume.
///
/// Production code uses [`HttpClient`]; tests drive the same consumers with
/// scripted pages and media streams.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch a page body as text.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// Fetch a media resource, exposing the body as a lazy chunk sequence.
    async fn get_media(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// HTTP client gated by the shared rate limiter.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpClient {
    /// Create a client with the given user agent and per-request timeout.
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.rate_limiter.admit().await;

        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Transient)?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(HttpResponse::from_reqwest(response))
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url).await?.text().await
    }

    async fn get_media(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.get(url).await
    }
}
