//! Outbound HTTP with a fixed back-off schedule.
//!
//! [`RequestExecutor`] sends a [`RequestSpec`] against a vendor base URL and
//! returns the decoded JSON body. Transport failures, `429` and `5xx`
//! responses are retried after each delay of the [`RetryPolicy`] schedule in
//! turn; once the schedule is exhausted the last status and body are
//! surfaced as [`ApiError::RequestFailed`]. Any other non-2xx status fails
//! on the first attempt.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::model::{Authorization, RequestBody, RequestSpec};

/// Delays, in seconds, between attempts when no schedule is configured.
pub const DEFAULT_BACKOFF_SECS: [u64; 2] = [1, 3];

/// Per-attempt transport timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// When and how long to wait before retrying a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before each retry. The request is attempted
    /// `backoff.len() + 1` times at most.
    pub backoff: Vec<Duration>,

    /// Statuses that trigger a retry. `None` means `429` and every `5xx`.
    pub retry_statuses: Option<Vec<u16>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_secs(&DEFAULT_BACKOFF_SECS)
    }
}

impl RetryPolicy {
    /// Build a policy from a schedule given in whole seconds.
    pub fn from_secs(delays: &[u64]) -> Self {
        Self {
            backoff: delays.iter().copied().map(Duration::from_secs).collect(),
            retry_statuses: None,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            backoff: Vec::new(),
            retry_statuses: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_retry_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.retry_statuses = Some(statuses);
        self
    }

    /// Maximum number of attempts, including the first one.
    pub fn max_attempts(&self) -> usize {
        self.backoff.len() + 1
    }

    /// Whether a response with this status should be retried.
    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        match &self.retry_statuses {
            Some(statuses) => statuses.contains(&status.as_u16()),
            None => status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
        }
    }
}

/// Status and body of a single attempt.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    /// Decode the body as JSON. An empty body decodes to `null`.
    pub fn json(&self) -> Result<serde_json::Value, ApiError> {
        decode_body(&self.body)
    }

    /// Decode the body as JSON, falling back to a JSON string holding the
    /// raw text. Used for vendor error payloads, which are not always JSON.
    pub fn payload(&self) -> serde_json::Value {
        decode_body(&self.body).unwrap_or_else(|_| serde_json::Value::String(self.body.clone()))
    }
}

fn decode_body(body: &str) -> Result<serde_json::Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

/// Sends requests against one vendor base URL.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl RequestExecutor {
    /// Create an executor with the default per-attempt timeout.
    pub fn new(base_url: impl Into<String>, policy: RetryPolicy) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, policy, DEFAULT_TIMEOUT)
    }

    /// Create an executor with a custom per-attempt timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            policy,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send the request once and return the raw status and body.
    ///
    /// Transport failures come back as [`ApiError::Transport`]; non-2xx
    /// statuses are returned as-is for the caller to interpret.
    pub async fn dispatch(&self, spec: &RequestSpec) -> Result<RawResponse, ApiError> {
        let target = spec.resolve_url(&self.base_url);
        let url = reqwest::Url::parse(&target).map_err(|e| ApiError::InvalidUrl {
            message: format!("{}: {}", target, e),
        })?;

        debug!("{} {}", spec.method, url);

        let mut request = self
            .client
            .request(spec.method.clone(), url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        request = match &spec.authorization {
            Authorization::None => request,
            Authorization::Token { token_type, token } => {
                request.header(AUTHORIZATION, format!("{} {}", token_type, token.expose()))
            }
            Authorization::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose()))
            }
            Authorization::ApiKey { header, key } => request.header(header.as_str(), key.expose()),
        };

        request = match &spec.body {
            None => request,
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Form(fields)) => request.form(fields),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }

    /// Send the request, retrying per the back-off schedule, and decode the
    /// JSON body of the first successful response.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<serde_json::Value, ApiError> {
        let max_attempts = self.policy.max_attempts();
        let mut delays = self.policy.backoff.iter();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let (status, body) = match self.dispatch(spec).await {
                Ok(response) if response.status.is_success() => return response.json(),
                Ok(response) => {
                    if !self.policy.is_retryable_status(response.status) {
                        return Err(ApiError::RequestFailed {
                            status: Some(response.status.as_u16()),
                            body: response.body,
                            attempts: attempt,
                        });
                    }
                    (Some(response.status.as_u16()), response.body)
                }
                Err(ApiError::Transport(e)) => (e.status().map(|s| s.as_u16()), e.to_string()),
                Err(e) => return Err(e),
            };

            match delays.next() {
                Some(delay) => {
                    warn!(
                        "{} {} failed (status {:?}), attempt {}/{}; retrying in {:?}",
                        spec.method, spec.path, status, attempt, max_attempts, delay
                    );
                    tokio::time::sleep(*delay).await;
                }
                None => {
                    return Err(ApiError::RequestFailed {
                        status,
                        body,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}
