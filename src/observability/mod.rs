//! Structured logging hooks.
//!
//! The crate only emits `tracing` events; installing a subscriber is up to
//! the application.

use crate::errors::{GitHubError, RateLimitInfo};
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

/// Tracing hooks for GitHub API operations.
pub struct TracingHooks;

impl TracingHooks {
    /// Logs the start of an API request.
    #[instrument(level = "trace", skip(method, url, headers))]
    pub fn on_request_start(method: &str, url: &str, headers: &HeaderMap) {
        debug!(
            method = %method,
            url = %url,
            "GitHub API request started"
        );
        for (name, value) in headers {
            trace!(
                header = %name,
                value = %redact_header(name.as_str(), value.to_str().unwrap_or("<binary>")),
                "Request header"
            );
        }
    }

    /// Logs the completion of an API request.
    pub fn on_request_complete(method: &str, url: &str, status: u16, duration: Duration) {
        debug!(
            method = %method,
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "GitHub API request completed"
        );
    }

    /// Logs a request error.
    pub fn on_request_error(method: &str, url: &str, error: &GitHubError) {
        warn!(
            method = %method,
            url = %url,
            kind = %error.kind(),
            status = error.status_code(),
            error = %error,
            "GitHub API request failed"
        );
    }

    /// Logs one fetched page.
    pub fn on_page_fetched(url: &str, page: u32, items: usize, has_next: bool) {
        debug!(
            url = %url,
            page = page,
            items = items,
            has_next = has_next,
            "Fetched page"
        );
    }

    /// Logs rate limit info.
    pub fn on_rate_limit_update(info: &RateLimitInfo) {
        trace!(
            limit = info.limit,
            remaining = info.remaining,
            reset_at = %info.reset_at,
            resource = info.resource.as_deref().unwrap_or("core"),
            "Rate limit updated"
        );
    }

    /// Logs rate limit exceeded.
    pub fn on_rate_limit_exceeded(info: &RateLimitInfo) {
        warn!(
            limit = info.limit,
            remaining = info.remaining,
            reset_at = %info.reset_at,
            resource = info.resource.as_deref().unwrap_or("core"),
            "Rate limit exceeded"
        );
    }
}

/// Sensitive headers that should be redacted in logs.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-github-token",
    "x-access-token",
    "cookie",
    "set-cookie",
];

/// Redacts sensitive values in headers.
pub fn redact_header(name: &str, value: &str) -> String {
    if SENSITIVE_HEADERS.contains(&name.to_lowercase().as_str()) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}
