//! Retry and rate-limit collaborators.
//!
//! Neither is used by the request core directly: retries wrap the default
//! transport, and the client consults a [`RateLimitHandler`] around each
//! dispatch.

use crate::config::{RateLimitConfig, RetryConfig};
use crate::errors::RateLimitInfo;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;

/// Retry executor with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    jitter: f64,
}

impl RetryExecutor {
    /// Creates a new retry executor.
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        multiplier: f64,
        jitter: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
            multiplier,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Creates an executor from the retry configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_backoff,
            config.max_backoff,
            config.multiplier,
            config.jitter,
        )
    }

    /// Runs `operation` until it yields an outcome `should_retry` rejects or
    /// the attempts run out. The last outcome is returned as-is.
    pub async fn execute<F, Fut, T, E>(
        &self,
        mut operation: F,
        should_retry: impl Fn(&Result<T, E>) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = operation().await;
            if attempt >= self.max_attempts || !should_retry(&outcome) {
                return outcome;
            }

            let delay = self.calculate_backoff(attempt);
            tracing::debug!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying request"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Calculates backoff duration for an attempt.
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max_backoff.as_millis() as f64);

        let jitter_range = capped * self.jitter;
        let jitter_value = rand::random::<f64>() * jitter_range * 2.0 - jitter_range;
        let final_delay = (capped + jitter_value).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}

/// Transport decorator retrying transient failures.
///
/// Retries connection failures, timeouts and 502/503/504 answers, but only for
/// idempotent methods. POST and PATCH are sent once. Any other outcome is
/// handed back untouched.
pub struct RetryingTransport<T> {
    inner: T,
    executor: RetryExecutor,
}

impl<T: HttpTransport> RetryingTransport<T> {
    /// Wraps `inner` with the given retry executor.
    pub fn new(inner: T, executor: RetryExecutor) -> Self {
        Self { inner, executor }
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

fn is_transient(outcome: &Result<HttpResponse, TransportError>) -> bool {
    match outcome {
        Ok(response) => matches!(
            response.status,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        ),
        Err(err) => err.is_retryable(),
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RetryingTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if !is_idempotent(&request.method) {
            return self.inner.send(request).await;
        }
        self.executor
            .execute(|| self.inner.send(request.clone()), is_transient)
            .await
    }
}

/// Collaborator consulted around every dispatch.
#[async_trait]
pub trait RateLimitHandler: Send + Sync {
    /// Called before a request is sent; may delay.
    async fn before_request(&self);

    /// Called with the limits reported by a response.
    async fn on_response(&self, info: &RateLimitInfo);
}

/// Handler that never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRateLimitHandler;

#[async_trait]
impl RateLimitHandler for NoopRateLimitHandler {
    async fn before_request(&self) {}

    async fn on_response(&self, _info: &RateLimitInfo) {}
}

/// Rate limit tracker for GitHub API.
pub struct RateLimitTracker {
    /// Maximum requests allowed.
    limit: AtomicU32,
    /// Remaining requests.
    remaining: AtomicU32,
    /// Reset time (Unix timestamp).
    reset_at: AtomicU64,
    /// Resource category.
    resource: Arc<RwLock<String>>,
    /// Buffer percentage (0.0 to 1.0).
    buffer_percentage: f64,
    wait_on_exhaustion: bool,
    max_wait: Duration,
}

impl RateLimitTracker {
    /// Creates a new rate limit tracker.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            limit: AtomicU32::new(5000),
            remaining: AtomicU32::new(5000),
            reset_at: AtomicU64::new(0),
            resource: Arc::new(RwLock::new("core".to_string())),
            buffer_percentage: config.buffer_percentage,
            wait_on_exhaustion: config.wait_on_exhaustion,
            max_wait: config.max_wait,
        }
    }

    /// Updates rate limit info from response headers.
    pub async fn update(&self, info: &RateLimitInfo) {
        self.limit.store(info.limit, Ordering::SeqCst);
        self.remaining.store(info.remaining, Ordering::SeqCst);
        self.reset_at
            .store(info.reset_at.timestamp().max(0) as u64, Ordering::SeqCst);

        if let Some(ref resource) = info.resource {
            let mut r = self.resource.write().await;
            *r = resource.clone();
        }
    }

    /// Gets the remaining requests.
    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Gets the rate limit.
    pub fn limit(&self) -> u32 {
        self.limit.load(Ordering::SeqCst)
    }

    /// Gets the resource category of the last update.
    pub async fn resource(&self) -> String {
        self.resource.read().await.clone()
    }

    /// Gets the reset time.
    pub fn reset_at(&self) -> DateTime<Utc> {
        let timestamp = self.reset_at.load(Ordering::SeqCst);
        DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_else(Utc::now)
    }

    /// Returns true once the remaining quota drops into the buffer zone.
    pub fn should_throttle(&self) -> bool {
        let limit = self.limit.load(Ordering::SeqCst) as f64;
        let remaining = self.remaining.load(Ordering::SeqCst) as f64;
        remaining <= limit * self.buffer_percentage
    }

    /// Calculates wait time if rate limited.
    pub fn wait_time(&self) -> Option<Duration> {
        if self.remaining.load(Ordering::SeqCst) > 0 {
            return None;
        }

        let reset_at = self.reset_at();
        let now = Utc::now();
        if reset_at > now {
            let wait = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
            Some(wait.min(self.max_wait))
        } else {
            None
        }
    }
}

#[async_trait]
impl RateLimitHandler for RateLimitTracker {
    async fn before_request(&self) {
        if !self.wait_on_exhaustion {
            return;
        }
        if let Some(wait_time) = self.wait_time() {
            let resource = self.resource().await;
            tracing::warn!(
                wait_secs = wait_time.as_secs(),
                resource = %resource,
                "Rate limit exhausted, waiting for reset"
            );
            sleep(wait_time).await;
        } else if self.should_throttle() {
            tracing::debug!(
                remaining = self.remaining(),
                limit = self.limit(),
                "Rate limit running low"
            );
        }
    }

    async fn on_response(&self, info: &RateLimitInfo) {
        self.update(info).await;
    }
}

/// Extracts rate limit info from response headers.
pub fn extract_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let header_u64 = |name: &str| -> Option<u64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    };

    let limit = header_u64("x-ratelimit-limit")? as u32;
    let remaining = header_u64("x-ratelimit-remaining")? as u32;
    let reset = header_u64("x-ratelimit-reset")?;
    let reset_at = DateTime::from_timestamp(reset as i64, 0)?;

    Some(RateLimitInfo {
        limit,
        remaining,
        reset_at,
        retry_after: header_u64("retry-after"),
        resource: headers
            .get("x-ratelimit-resource")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::header::HeaderValue;
    use std::sync::atomic::AtomicUsize;

    fn quick_executor(attempts: u32) -> RetryExecutor {
        RetryExecutor::new(
            attempts,
            Duration::from_millis(1),
            Duration::from_millis(5),
            2.0,
            0.0,
        )
    }

    #[test]
    fn test_retry_backoff_calculation() {
        let executor = RetryExecutor::new(
            3,
            Duration::from_secs(1),
            Duration::from_secs(60),
            2.0,
            0.0,
        );

        assert_eq!(executor.calculate_backoff(1), Duration::from_secs(1));
        assert_eq!(executor.calculate_backoff(2), Duration::from_secs(2));
        assert_eq!(executor.calculate_backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_is_capped() {
        let executor = RetryExecutor::new(
            10,
            Duration::from_secs(1),
            Duration::from_secs(5),
            2.0,
            0.0,
        );
        assert_eq!(executor.calculate_backoff(8), Duration::from_secs(5));
    }

    struct FlakyTransport {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl HttpTransport for FlakyTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(TransportError::Network("connection reset".into()))
            } else {
                Ok(HttpResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new()))
            }
        }
    }

    fn request() -> HttpRequest {
        HttpRequest {
            method: reqwest::Method::GET,
            url: url::Url::parse("https://api.github.com/user").unwrap(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_retrying_transport_recovers() {
        let transport = RetryingTransport::new(
            FlakyTransport {
                calls: AtomicUsize::new(0),
                failures: 2,
            },
            quick_executor(3),
        );

        let response = transport.send(request()).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(transport.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retrying_transport_gives_up() {
        let transport = RetryingTransport::new(
            FlakyTransport {
                calls: AtomicUsize::new(0),
                failures: 5,
            },
            quick_executor(2),
        );

        assert!(transport.send(request()).await.is_err());
        assert_eq!(transport.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retrying_transport_sends_post_once() {
        let transport = RetryingTransport::new(
            FlakyTransport {
                calls: AtomicUsize::new(0),
                failures: 1,
            },
            quick_executor(3),
        );

        let post = HttpRequest {
            method: reqwest::Method::POST,
            ..request()
        };
        assert!(transport.send(post).await.is_err());
        assert_eq!(transport.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_only_idempotent_methods_are_retried() {
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::PUT));
        assert!(is_idempotent(&Method::DELETE));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PATCH));
    }

    #[tokio::test]
    async fn test_rate_limit_tracker() {
        let tracker = RateLimitTracker::new(&RateLimitConfig::default());

        let info = RateLimitInfo {
            limit: 5000,
            remaining: 1000,
            reset_at: Utc::now() + chrono::Duration::hours(1),
            retry_after: None,
            resource: Some("search".to_string()),
        };

        tracker.on_response(&info).await;

        assert_eq!(tracker.limit(), 5000);
        assert_eq!(tracker.remaining(), 1000);
        assert_eq!(tracker.resource().await, "search");
        assert!(!tracker.should_throttle());
        assert!(tracker.wait_time().is_none());
    }

    #[tokio::test]
    async fn test_exhausted_quota_wait_is_capped() {
        let tracker = RateLimitTracker::new(&RateLimitConfig {
            max_wait: Duration::from_secs(5),
            ..Default::default()
        });

        tracker
            .update(&RateLimitInfo {
                limit: 60,
                remaining: 0,
                reset_at: Utc::now() + chrono::Duration::hours(1),
                retry_after: None,
                resource: None,
            })
            .await;

        assert!(tracker.should_throttle());
        assert_eq!(tracker.wait_time(), Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_tracker_wait_runs_on_spawned_task() {
        let tracker = Arc::new(RateLimitTracker::new(&RateLimitConfig {
            max_wait: Duration::from_millis(5),
            ..Default::default()
        }));
        tracker
            .update(&RateLimitInfo {
                limit: 60,
                remaining: 0,
                reset_at: Utc::now() + chrono::Duration::hours(1),
                retry_after: None,
                resource: Some("search".to_string()),
            })
            .await;

        let waiting = Arc::clone(&tracker);
        tokio::spawn(async move { waiting.before_request().await })
            .await
            .unwrap();
    }

    #[test]
    fn test_extract_rate_limit() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        headers.insert("x-ratelimit-resource", HeaderValue::from_static("core"));

        let info = extract_rate_limit(&headers).unwrap();
        assert_eq!(info.limit, 5000);
        assert_eq!(info.remaining, 4999);
        assert_eq!(info.reset_at.timestamp(), 1_700_000_000);
        assert_eq!(info.resource.as_deref(), Some("core"));
    }

    #[test]
    fn test_extract_rate_limit_missing_headers() {
        assert!(extract_rate_limit(&HeaderMap::new()).is_none());
    }
}
