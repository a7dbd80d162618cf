//! Shared HTTP plumbing for the provider clients

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tracing::{debug, warn};

use super::LlmError;

/// Maximum number of retries for transient errors
pub(super) const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Wait when a 429 carries no usable retry-after header
const DEFAULT_RETRY_AFTER_SECS: u64 = 10;

/// Longest retry-after honoured before giving up on the request
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Check if an HTTP status code is retryable
pub(super) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504 | 529)
}

pub(super) fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt.saturating_sub(1)))
}

/// How long to wait before retrying after `error` on `attempt` (0-based)
///
/// `None` means give up: the error is permanent, retries are exhausted, or the
/// server asked for a longer pause than we are willing to wait.
pub(super) fn retry_delay(error: &LlmError, attempt: u32) -> Option<Duration> {
    if attempt >= MAX_RETRIES || !error.is_retryable() {
        return None;
    }
    match error.retry_after() {
        Some(wait) if wait > Duration::from_secs(MAX_RETRY_AFTER_SECS) => None,
        Some(wait) => Some(wait),
        None => Some(backoff(attempt + 1)),
    }
}

/// Send once, mapping non-success statuses to errors
async fn send_once(request: RequestBuilder) -> Result<Response, LlmError> {
    let response = request.send().await?;
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(LlmError::RateLimited {
            retry_after: Duration::from_secs(retry_after),
        });
    }

    if !response.status().is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiError { status, message });
    }

    Ok(response)
}

/// Send a request, retrying transient failures
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by `send`. Rate limits wait for the server's retry-after; other transient
/// errors back off exponentially.
pub(super) async fn send_with_retry(build: impl Fn() -> RequestBuilder) -> Result<Response, LlmError> {
    let mut attempt = 0;
    loop {
        let error = match send_once(build()).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let Some(delay) = retry_delay(&error, attempt) else {
            debug!(attempt, error = %error, "send_with_retry: giving up");
            return Err(error);
        };

        if error.is_rate_limit() {
            warn!(attempt, wait_secs = delay.as_secs(), "Rate limited by LLM provider, waiting");
        } else {
            warn!(
                attempt,
                backoff_ms = delay.as_millis() as u64,
                error = %error,
                "send_with_retry: retrying after transient error"
            );
        }
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
