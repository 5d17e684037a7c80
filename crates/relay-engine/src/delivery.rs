//! Outbound HTTP delivery and outcome classification.
//!
//! The executor performs exactly one attempt per call and reports what it
//! observed; it never mutates task state. Applying the outcome to the
//! durable record is the [`crate::outcome::OutcomeHandler`]'s job.
//!
//! ## Classification
//!
//! | Observed outcome | Disposition |
//! |------------------|-------------|
//! | Connect failure / timeout / socket error | retry (network) |
//! | 2xx | success |
//! | 3xx | fail (redirects are not followed) |
//! | 408, 429 | retry (transient client) |
//! | other 4xx | fail (client error) |
//! | 5xx | retry (server error) |
//! | any other send failure | retry (system) |

use std::time::Instant;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::task::{HttpMethod, NotificationTask};

/// Why an attempt is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Connect failure, read timeout, or socket error; no HTTP status.
    Network,
    /// HTTP 408 or 429.
    TransientClient,
    /// HTTP 5xx.
    ServerError,
    /// Any other failure while building or sending the request.
    System,
}

/// Why an attempt failed terminally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// HTTP 3xx; the relay does not follow redirects.
    Redirect,
    /// HTTP 4xx other than 408/429.
    ClientError,
}

/// Classified result of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The target accepted the call (2xx).
    Success,
    /// The attempt failed but may be retried.
    Retry(RetryReason),
    /// The attempt failed terminally.
    Fail(FailReason),
}

impl Disposition {
    /// Returns true for the success disposition.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true when the attempt may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retry(_))
    }
}

/// Everything the outcome handler needs about one attempt.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    /// Classified disposition (first matching table row wins).
    pub disposition: Disposition,
    /// HTTP status, if the target answered at all.
    pub http_status: Option<u16>,
    /// Raw response body (truncated later by the log store).
    pub response_body: Option<String>,
    /// Failure description, `None` on success.
    pub error_message: Option<String>,
    /// Attempt duration from just before the send to outcome return.
    pub latency_ms: u64,
}

/// Classifies an observed HTTP status code.
///
/// Statuses outside 100..=599 cannot come out of a well-formed response;
/// they are treated as a system-level anomaly and retried.
#[must_use]
pub fn classify_status(status: u16) -> Disposition {
    match status {
        200..=299 => Disposition::Success,
        300..=399 => Disposition::Fail(FailReason::Redirect),
        408 | 429 => Disposition::Retry(RetryReason::TransientClient),
        400..=499 => Disposition::Fail(FailReason::ClientError),
        500..=599 => Disposition::Retry(RetryReason::ServerError),
        _ => Disposition::Retry(RetryReason::System),
    }
}

/// Performs outbound HTTP attempts for claimed tasks.
#[derive(Debug, Clone)]
pub struct DeliveryExecutor {
    client: reqwest::Client,
}

impl DeliveryExecutor {
    /// Builds an executor with the configured connect/read timeouts.
    ///
    /// Redirect following is disabled so 3xx responses surface to the
    /// classifier instead of being resolved transparently.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::configuration(format!("failed to build delivery client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing client (tests).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Performs exactly one outbound attempt for `task`.
    ///
    /// Latency is measured from just before the send to outcome return.
    pub async fn execute(&self, task: &NotificationTask) -> DeliveryReport {
        let started = Instant::now();

        let headers = match build_headers(task) {
            Ok(headers) => headers,
            Err(message) => {
                return DeliveryReport {
                    disposition: Disposition::Retry(RetryReason::System),
                    http_status: None,
                    response_body: None,
                    error_message: Some(message),
                    latency_ms: elapsed_ms(started),
                };
            }
        };

        let request = self
            .client
            .request(method_of(task.http_method), &task.target_url)
            .headers(headers)
            .json(&task.body);

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                let latency_ms = elapsed_ms(started);
                let disposition = classify_status(status);
                let error_message = if disposition.is_success() {
                    None
                } else {
                    Some(format!("HTTP {status}: {body}"))
                };

                DeliveryReport {
                    disposition,
                    http_status: Some(status),
                    response_body: Some(body),
                    error_message,
                    latency_ms,
                }
            }
            Err(e) => {
                let latency_ms = elapsed_ms(started);
                let (reason, label) = if e.is_connect() || e.is_timeout() {
                    (RetryReason::Network, "network error")
                } else {
                    (RetryReason::System, "request error")
                };

                DeliveryReport {
                    disposition: Disposition::Retry(reason),
                    http_status: None,
                    response_body: None,
                    error_message: Some(format!("{label}: {e}")),
                    latency_ms,
                }
            }
        }
    }
}

const fn method_of(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
    }
}

/// Builds the request header map: JSON content type unless the task's
/// headers override it, single value per name (last write wins).
fn build_headers(task: &NotificationTask) -> std::result::Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &task.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name '{name}': {e}"))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| format!("invalid value for header '{name}': {e}"))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
