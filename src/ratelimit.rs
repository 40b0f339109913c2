//! Rate-limit detection and retry for outbound API calls.
//!
//! GitHub signals rate limiting two ways: HTTP 429, or HTTP 403 with
//! `x-ratelimit-remaining: 0` (a plain 403 is a permission failure and must
//! not be retried). When a call is rate limited, the response tells us how
//! long to wait: `Retry-After` in seconds, or `x-ratelimit-reset` as an
//! epoch timestamp. Absent both, we fall back to exponential backoff capped
//! at a configured maximum sleep.
//!
//! Retries block only the current delivery's task; no lock is held across
//! the sleep.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::RestClient;
use crate::error::{GitHubAppError, ResponseData};

/// Configuration for rate-limit retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum number of retries (total attempts = retries + 1).
    pub retries: u32,

    /// Cap on any single sleep computed from the backoff formula.
    pub max_sleep: Duration,

    /// Base for the exponential fallback: `base_delay * 2^attempt`.
    pub base_delay: Duration,
}

impl RateLimitConfig {
    /// Default policy: 3 retries, sleeps capped at one minute.
    pub const DEFAULT: Self = Self {
        retries: 3,
        max_sleep: Duration::from_secs(60),
        base_delay: Duration::from_secs(60),
    };

    /// Computes how long to wait before retrying a rate-limited call.
    ///
    /// Preference order:
    /// 1. `Retry-After` header, taken verbatim
    /// 2. `x-ratelimit-reset`, as seconds until that epoch instant
    /// 3. exponential backoff `base_delay * 2^attempt`, capped at
    ///    `max_sleep`
    pub fn retry_delay(&self, response: &ResponseData, attempt: u32) -> Duration {
        if let Some(secs) = response
            .retry_after
            .as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            return Duration::from_secs(secs);
        }

        if let Some(reset) = response
            .ratelimit_reset
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
        {
            let until_reset = reset.saturating_sub(Utc::now().timestamp());
            return Duration::from_secs(until_reset.max(0) as u64);
        }

        let raw = self.base_delay.as_secs_f64() * 2f64.powi(attempt as i32);
        Duration::from_secs_f64(raw.min(self.max_sleep.as_secs_f64()))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Returns true if the response indicates rate limiting.
///
/// 429 always does; 403 only when `x-ratelimit-remaining` is `"0"` (a 403
/// with quota remaining is a permission denial).
pub fn is_rate_limited(response: &ResponseData) -> bool {
    match response.status {
        429 => true,
        403 => response.ratelimit_remaining.as_deref() == Some("0"),
        _ => false,
    }
}

/// Runs an async operation, retrying while it fails with a rate-limited
/// response.
///
/// Non-rate-limit errors propagate immediately, unretried. After
/// `config.retries` retries (i.e. `retries + 1` total attempts) the last
/// rate-limited response is surfaced as
/// [`GitHubAppError::RateLimitExhausted`].
pub async fn retry_with_rate_limit<T, F, Fut>(
    config: &RateLimitConfig,
    mut operation: F,
) -> Result<T, GitHubAppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubAppError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let rate_limited = err.response().map(is_rate_limited).unwrap_or(false);
        if !rate_limited {
            return Err(err);
        }

        // err.response() is Some here by the check above.
        let response = err.response().cloned().unwrap_or_default();

        if attempt >= config.retries {
            warn!(
                attempts = attempt + 1,
                status = response.status,
                "rate limit retries exhausted"
            );
            return Err(GitHubAppError::RateLimitExhausted {
                attempts: attempt + 1,
                response,
            });
        }

        let delay = config.retry_delay(&response, attempt);
        debug!(
            attempt,
            delay_secs = delay.as_secs(),
            "rate limited, backing off"
        );
        attempt += 1;
        tokio::time::sleep(delay).await;
    }
}

/// A REST handle whose every call retries under the rate-limit policy.
///
/// This is what hooks receive from their context: a per-delivery wrapper
/// around the installation-scoped [`RestClient`]. Nothing shared is
/// mutated, so a wrapper constructed for one delivery can never leak into
/// another.
#[derive(Debug, Clone)]
pub struct GuardedClient {
    rest: RestClient,
    config: RateLimitConfig,
}

impl GuardedClient {
    pub fn new(rest: RestClient, config: RateLimitConfig) -> Self {
        Self { rest, config }
    }

    /// The unguarded REST handle.
    pub fn inner(&self) -> &RestClient {
        &self.rest
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, GitHubAppError> {
        let rest = &self.rest;
        retry_with_rate_limit(&self.config, move || rest.get(path, query)).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, GitHubAppError> {
        let rest = &self.rest;
        retry_with_rate_limit(&self.config, move || rest.post(path, body)).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, GitHubAppError> {
        let rest = &self.rest;
        retry_with_rate_limit(&self.config, move || rest.patch(path, body)).await
    }

    pub async fn put(&self, path: &str, body: Option<&Value>) -> Result<Value, GitHubAppError> {
        let rest = &self.rest;
        retry_with_rate_limit(&self.config, move || rest.put(path, body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, GitHubAppError> {
        let rest = &self.rest;
        retry_with_rate_limit(&self.config, move || rest.delete(path)).await
    }
}
