//! HTTP retry helpers for transient errors.
//!
//! [`HttpRecordSource`](crate::http::HttpRecordSource) sends every request
//! through [`send_json`] so that timeouts, connection resets, rate
//! limiting and server errors are retried with exponential backoff before
//! a period is given up as missing.

use std::time::Duration;

use crate::RecordError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// How many times, and how patiently, a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles on every further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// Three retries at 1s, 2s, 4s.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt because
/// [`reqwest::RequestBuilder`] is consumed by `.send()`.
///
/// Does **not** retry HTTP 4xx (except 429) or undecodable bodies.
///
/// # Errors
///
/// Returns [`RecordError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    build_request: F,
    policy: RetryPolicy,
) -> Result<serde_json::Value, RecordError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, policy).await?;
    let url = response.url().to_string();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview = text.get(..BODY_PREVIEW_LEN).unwrap_or(&text);
        log::error!("JSON parse failed for {url}: {e}\n  body preview: {preview}");
        RecordError::Json(e)
    })
}

/// Retry loop: returns the first 2xx/3xx response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    policy: RetryPolicy,
) -> Result<reqwest::Response, RecordError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < policy.max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && can_retry {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(RecordError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if can_retry {
                        log::warn!("  HTTP {status} from {}", response.url());
                        continue;
                    }
                    return Err(RecordError::Normalization {
                        message: format!("HTTP {status} after {} retries", policy.max_retries),
                    });
                }

                if status.is_client_error() {
                    return Err(RecordError::Normalization {
                        message: format!("HTTP {status}"),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
