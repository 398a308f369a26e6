//! Shared HTTP client
//!
//! Thin wrapper over reqwest that adds bounded retries for server errors and
//! transport failures, plus status checking that keeps the response body for
//! diagnostics. Calendar calls build it with a single attempt.

use std::time::Duration;

use calmate_domain::{CalmateError, Result};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::errors::InfraError;

const USER_AGENT: &str = concat!("calmate/", env!("CARGO_PKG_VERSION"));

/// reqwest client plus a retry budget shared by every outbound call.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Three attempts, 30s timeout.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Request builder on the underlying reqwest client; send it with
    /// [`HttpClient::send`] to get the retries.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send with retries on 5xx responses and transient transport failures.
    ///
    /// Any HTTP status is returned as `Ok`; only transport failures are
    /// errors.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let mut attempt = 1;
        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    CalmateError::Internal("streaming request bodies cannot be retried".into())
                })?
                .build()
                .map_err(InfraError::from)?;
            let method = request.method().clone();
            let path = request.url().path().to_string();
            let retries_left = attempt < self.max_attempts;

            let outcome = self.client.execute(request).await;
            match outcome {
                Ok(response) if retries_left && response.status().is_server_error() => {
                    let status = response.status();
                    warn!(attempt, %method, path = %path, %status, "server error, will retry");
                }
                Ok(response) => {
                    debug!(attempt, %method, path = %path, status = %response.status(), "HTTP response");
                    return Ok(response);
                }
                Err(err) if retries_left && is_transient(&err) => {
                    warn!(attempt, %method, path = %path, error = %err, "transport error, will retry");
                }
                Err(err) => return Err(InfraError::from(err).into()),
            }

            let delay = self.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    /// Send and require exactly `expected`; any other status becomes
    /// `RemoteApi` carrying the raw body.
    pub async fn send_expecting(
        &self,
        builder: RequestBuilder,
        expected: StatusCode,
    ) -> Result<Response> {
        let response = self.send(builder).await?;
        if response.status() == expected {
            return Ok(response);
        }
        Err(remote_api_error(response).await)
    }

    /// Doubling delay, capped at 2^8 times the base.
    fn backoff(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(8);
        self.base_backoff.saturating_mul(2u32.pow(exponent))
    }
}

/// Convert an unexpected response into `RemoteApi` with its body.
pub async fn remote_api_error(response: Response) -> CalmateError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    CalmateError::RemoteApi { status, body }
}

/// Knobs for [`HttpClient`]; defaults suit token and model endpoints.
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

impl HttpClientBuilder {
    /// Per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total tries including the first; clamped to at least one.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry; doubles after each attempt.
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns `CalmateError::Network` when reqwest cannot initialise its
    /// TLS backend.
    pub fn build(self) -> Result<HttpClient> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(InfraError::from)?;

        Ok(HttpClient { client, max_attempts: self.max_attempts, base_backoff: self.base_backoff })
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
