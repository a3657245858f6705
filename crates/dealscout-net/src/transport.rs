//! Retry decorator around an HTTP send capability.
//!
//! Retries requests whose response status is in the configured retryable set
//! (429 and the transient 5xx family by default) and requests that fail with
//! connection-level errors (timeout, refused, reset). On exhaustion the last
//! response is returned as-is so the caller sees the final error status
//! instead of losing it.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Request, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced once retries are exhausted or the request is unusable.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

/// Anything that can send a [`reqwest::Request`]. Implemented by
/// [`reqwest::Client`]; tests substitute scripted transports.
#[async_trait]
pub trait HttpSend: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error>;
}

#[async_trait]
impl HttpSend for reqwest::Client {
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error> {
        self.execute(request).await
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt ceiling, counting the first attempt. Must be >= 1.
    pub max_attempts: u32,
    /// Response statuses treated as transient.
    pub retryable_status: HashSet<StatusCode>,
    /// Delay before the first retry; doubles on every subsequent one.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retryable_status: [
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::BAD_GATEWAY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ]
            .into_iter()
            .collect(),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_status.contains(&status)
    }

    /// Exponential delay for the retry following `attempt`, with up to 25%
    /// jitter so concurrent callers do not synchronize.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let exp = self.base_delay.saturating_mul(1u32 << shift);
        let capped = exp.min(self.max_delay);
        capped.mul_f64(1.0 + rand::thread_rng().gen_range(0.0..0.25))
    }
}

/// Connection-level failures worth retrying. Builder and decode errors are
/// caller bugs and pass straight through.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Decorator around an [`HttpSend`] implementation.
///
/// Stateless and reentrant: one instance is shared by every concurrent call
/// site. Callers must treat a returned error-status response on the final
/// attempt as a failure; the transport never swallows it.
#[derive(Debug, Clone)]
pub struct RetryingTransport<S: HttpSend = reqwest::Client> {
    inner: S,
    policy: RetryPolicy,
}

impl RetryingTransport<reqwest::Client> {
    pub fn new(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self::with_transport(client, policy)
    }
}

impl<S: HttpSend> RetryingTransport<S> {
    pub fn with_transport(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends `request`, retrying transient failures up to the attempt
    /// ceiling. Requests with streaming bodies cannot be cloned and get
    /// exactly one attempt.
    pub async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let mut attempt: u32 = 1;
        let mut current = request;

        loop {
            // A retry needs a fresh copy before the original is consumed.
            let replay = if attempt < self.policy.max_attempts {
                current.try_clone()
            } else {
                None
            };
            let url = current.url().clone();

            match self.inner.send(current).await {
                Ok(response) => {
                    let status = response.status();
                    if !self.policy.is_retryable_status(status) {
                        return Ok(response);
                    }
                    match replay {
                        Some(next) => {
                            let delay = self.policy.backoff_delay(attempt);
                            warn!(
                                %url,
                                %status,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "retryable status, backing off"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            current = next;
                        }
                        // Final attempt (or uncloneable request): hand the
                        // error-status response back to the caller.
                        None => return Ok(response),
                    }
                }
                Err(err) => {
                    if !is_transient(&err) {
                        return Err(TransportError::Request(err));
                    }
                    match replay {
                        Some(next) => {
                            let delay = self.policy.backoff_delay(attempt);
                            debug!(
                                %url,
                                error = %err,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "transient transport error, backing off"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            current = next;
                        }
                        None => {
                            return Err(TransportError::Exhausted {
                                attempts: attempt,
                                source: err,
                            })
                        }
                    }
                }
            }
        }
    }
}
