//! Retrying, rate-limit aware GitHub API client.
//!
//! Every outbound call goes through [`ApiClient::execute`], which retries
//! transport failures and 5xx responses with exponential backoff, waits out
//! an exhausted rate limit using the server's own reset time, and bounds the
//! whole loop with a single end-to-end deadline.
use derive_builder::Builder;
use log::*;
use reqwest::StatusCode;
use std::{sync::Arc, time::Duration};

use crate::{
    error::{Outcome, StoreError},
    store::{
        clock::{Clock, SystemClock},
        transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport},
    },
};

/// Header carrying the number of requests left in the window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the epoch second at which the window resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";
/// Header sent with secondary rate limits.
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Tunables for [`ApiClient`].
#[derive(Debug, Clone, Builder)]
#[builder(default, setter(into))]
pub struct RetryOptions {
    /// Physical attempts per call, including the first.
    pub max_attempts: u32,
    /// Base of the exponential backoff in seconds.
    pub backoff_factor: u64,
    /// Wall-clock limit for a single HTTP exchange.
    pub request_timeout: Duration,
    /// Wall-clock limit for the whole retry loop.
    pub operation_deadline: Duration,
    /// Minimum wait after hitting the rate limit.
    pub rate_limit_floor: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 2,
            request_timeout: Duration::from_secs(30),
            operation_deadline: Duration::from_secs(120),
            rate_limit_floor: Duration::from_secs(60),
        }
    }
}

impl RetryOptions {
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::default()
    }

    /// Sleep before the retry that follows the zero-based `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_factor.saturating_pow(attempt))
    }
}

/// Executes GitHub API requests with retries and classifies the result.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    options: RetryOptions,
}

impl ApiClient {
    /// Client talking to the network over reqwest with real timers.
    pub fn new(options: RetryOptions) -> Outcome<Self> {
        let transport = ReqwestTransport::new(options.request_timeout)?;
        Ok(Self::with_parts(
            Arc::new(transport),
            Arc::new(SystemClock),
            options,
        ))
    }

    pub fn with_parts(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        options: RetryOptions,
    ) -> Self {
        Self {
            transport,
            clock,
            options,
        }
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Current time according to the client's clock.
    pub fn now_epoch_secs(&self) -> i64 {
        self.clock.now_epoch_secs()
    }

    /// Send `request`, retrying transient failures, and return the parsed
    /// JSON body of a 200/201 response.
    pub async fn execute(&self, request: ApiRequest) -> Outcome<serde_json::Value> {
        let op_id = nanoid::nanoid!(8);
        let deadline = self.options.operation_deadline;

        debug!("[{op_id}] {}", request.describe());

        match tokio::time::timeout(deadline, self.run(&op_id, &request)).await {
            Ok(outcome) => {
                if let Err(err) = &outcome {
                    debug!("[{op_id}] failed with {}: {err}", err.kind());
                }
                outcome
            }
            Err(_) => {
                warn!(
                    "[{op_id}] {} exceeded deadline of {}s",
                    request.describe(),
                    deadline.as_secs()
                );
                Err(StoreError::Timeout(format!(
                    "operation did not complete within {}s",
                    deadline.as_secs()
                )))
            }
        }
    }

    async fn run(
        &self,
        op_id: &str,
        request: &ApiRequest,
    ) -> Outcome<serde_json::Value> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            debug!("[{op_id}] attempt {}/{max_attempts}", attempt + 1);

            let outcome = match self.transport.send(request.clone()).await {
                Ok(response) => self.classify(response),
                Err(err) => Err(err.into()),
            };

            let err = match outcome {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };

            let has_more = attempt + 1 < max_attempts;

            if !has_more || !err.is_transient() {
                return Err(err);
            }

            let delay = match &err {
                StoreError::RateLimitExceeded {
                    retry_after_secs, ..
                } => Duration::from_secs(*retry_after_secs),
                _ => self.options.backoff(attempt),
            };

            warn!(
                "[{op_id}] {}: retrying in {}s ({}/{max_attempts})",
                err,
                delay.as_secs(),
                attempt + 1
            );

            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }

    /// Map a raw response onto the outcome taxonomy.
    fn classify(&self, response: ApiResponse) -> Outcome<serde_json::Value> {
        if let Some(wait) = self.rate_limit_wait(&response) {
            return Err(StoreError::rate_limited(
                error_message(&response),
                wait.as_secs(),
            ));
        }

        match response.status {
            StatusCode::OK | StatusCode::CREATED => {
                if response.body.trim().is_empty() {
                    return Ok(serde_json::Value::Null);
                }
                Ok(serde_json::from_str(&response.body)?)
            }
            status => Err(StoreError::ApiError {
                status: status.as_u16(),
                message: error_message(&response),
                body: serde_json::from_str(&response.body)
                    .unwrap_or(serde_json::Value::String(response.body.clone())),
            }),
        }
    }

    /// How long to wait before trying again, if `response` says the rate
    /// limit is exhausted. Never less than the configured floor.
    fn rate_limit_wait(&self, response: &ApiResponse) -> Option<Duration> {
        let floor = self.options.rate_limit_floor.as_secs();

        let raw = match response.status {
            StatusCode::FORBIDDEN
                if response.header(RATE_LIMIT_REMAINING_HEADER) == Some("0") =>
            {
                self.seconds_until_reset(response)
            }
            StatusCode::TOO_MANY_REQUESTS => response
                .header(RETRY_AFTER_HEADER)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .or_else(|| self.seconds_until_reset(response)),
            _ => return None,
        };

        Some(Duration::from_secs(raw.unwrap_or(0).max(floor)))
    }

    fn seconds_until_reset(&self, response: &ApiResponse) -> Option<u64> {
        let reset = response
            .header(RATE_LIMIT_RESET_HEADER)?
            .trim()
            .parse::<i64>()
            .ok()?;
        let remaining = reset - self.clock.now_epoch_secs();
        Some(remaining.max(0) as u64)
    }
}

/// Human readable message from a GitHub error body.
fn error_message(response: &ApiResponse) -> String {
    serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|body| body["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            response
                .status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}
