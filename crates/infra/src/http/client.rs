//! Retrying HTTP transport
//!
//! Both outbound integrations (the WLED device and the WebDriver endpoint)
//! sit on the local network, where a refused connection or a 5xx is usually
//! a momentary hiccup. This wrapper retries those; 4xx responses are handed
//! back to the caller untouched so each adapter applies its own semantics.

use std::time::Duration;

use deskglow_domain::{DeskglowError, Result};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// Timeout and retry policy for one outbound integration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Per-request timeout
    pub timeout: Duration,
    /// Total attempts, including the first try
    pub attempts: usize,
    /// Delay before the first retry; doubled for each retry after that
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    fn delay_after(&self, attempt: usize) -> Duration {
        let doublings = attempt.saturating_sub(1).min(8) as u32;
        self.backoff.saturating_mul(1 << doublings)
    }
}

/// Shared HTTP transport applying a [`RetryPolicy`] to every request.
#[derive(Clone)]
pub struct HttpClient {
    inner: ReqwestClient,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn with_policy(policy: RetryPolicy) -> Result<Self> {
        let inner = ReqwestClient::builder()
            .timeout(policy.timeout)
            .no_proxy()
            .build()
            .map_err(|err| DeskglowError::from(InfraError::from(err)))?;
        Ok(Self { inner, policy })
    }

    /// Request builder on the underlying transport; pass the result to
    /// [`send`](Self::send).
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.inner.request(method, url)
    }

    /// Send a request, retrying transient failures per the policy.
    ///
    /// The builder's body must be buffered (not a stream) so each attempt
    /// can clone it.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1usize;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    DeskglowError::Internal("streaming request bodies cannot be retried".into())
                })?
                .build()
                .map_err(|err| DeskglowError::from(InfraError::from(err)))?;
            let url = request.url().clone();

            match self.inner.execute(request).await {
                Ok(response) if response.status().is_server_error() && attempt < attempts => {
                    debug!(%url, attempt, status = %response.status(), "Retrying after server error");
                }
                Ok(response) => return Ok(response),
                Err(err) if attempt < attempts && is_transient(&err) => {
                    debug!(%url, attempt, error = %err, "Retrying after transport error");
                }
                Err(err) => return Err(DeskglowError::from(InfraError::from(err))),
            }

            tokio::time::sleep(self.policy.delay_after(attempt)).await;
            attempt += 1;
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}
