use std::time::Duration;

use calpilot_domain::CalPilotError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::errors::InfraError;

const BASE_BACKOFF: Duration = Duration::from_millis(200);

/// Shared reqwest client for the Google and Gemini adapters.
///
/// Idempotent requests are retried on `5xx`, `429` and connection failures
/// with exponential backoff. `POST` and `PATCH` go out exactly once: a
/// retried insert could land the same event twice.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, CalPilotError> {
        Self::builder().build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, CalPilotError> {
        let mut attempt = 1;
        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| CalPilotError::Internal("request body is not replayable".into()))?
                .build()
                .map_err(|err| CalPilotError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let attempts = if is_idempotent(&method) { self.max_attempts } else { 1 };
            // Query strings may carry API keys; log the path only.
            let path = request.url().path().to_string();
            debug!(attempt, %method, %path, "Sending HTTP request");

            let retry = match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable_status(status) || attempt >= attempts {
                        debug!(attempt, %method, %path, %status, "HTTP response");
                        return Ok(response);
                    }
                    status.to_string()
                }
                Err(err) => {
                    let err = err.without_url();
                    if !is_transient(&err) || attempt >= attempts {
                        debug!(attempt, %method, %path, error = %err, "HTTP request failed");
                        return Err(InfraError::from(err).into());
                    }
                    err.to_string()
                }
            };

            let delay = backoff(attempt);
            warn!(attempt, %method, %path, reason = %retry, delay_ms = delay.as_millis() as u64, "Retrying HTTP request");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), max_attempts: 3 }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts for idempotent requests, including the first.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn build(self) -> Result<HttpClient, CalPilotError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(concat!("calpilot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| CalPilotError::from(InfraError::from(err)))?;

        Ok(HttpClient { client, max_attempts: self.max_attempts })
    }
}

fn is_idempotent(method: &Method) -> bool {
    !matches!(*method, Method::POST | Method::PATCH)
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn backoff(attempt: usize) -> Duration {
    BASE_BACKOFF.saturating_mul(1 << (attempt - 1).min(6))
}
