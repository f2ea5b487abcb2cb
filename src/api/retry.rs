//! Single logical API call with bounded exponential backoff

use super::classifier::{ErrorClassifier, FailureDescription};
use super::transport::{AuthError, HttpRequest, HttpResponse, Method, TokenProvider, Transport, TransportError};
use crate::address::{expand_uri, UriArgs};
use crate::error::{SheetError, SheetResult};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff schedule and retry bounds
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Wait before the first retry
    pub initial_interval: Duration,
    pub multiplier: f64,
    /// Upper bound for the exponential schedule
    pub max_interval: Duration,
    /// Total attempts, the first call included
    pub max_attempts: u32,
    /// Longest server-requested `Retry-After` still honored
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 2.0,
            max_interval: Duration::from_millis(5000),
            max_attempts: 14,
            max_retry_after: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that fails on the first error
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_max_retry_after(mut self, ceiling: Duration) -> Self {
        self.max_retry_after = ceiling;
        self
    }

    /// Wait after the failed attempt number `attempt` (1-based):
    /// `min(max_interval, initial_interval * multiplier^(attempt-1))`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        // cap the exponent, the result is clamped to max_interval anyway
        let exponent = attempt.min(30) as i32 - 1;
        let delay_ms = self.initial_interval.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_interval.as_millis() as f64).max(0.0);

        Duration::from_millis(capped_ms as u64)
    }
}

/// Blocks the calling thread between attempts
pub type Sleeper = Box<dyn Fn(Duration)>;

/// Issues one logical call, retrying classified-transient failures.
///
/// Every physical attempt asks the token provider for a fresh token and
/// carries a new `client-request-id`.
pub struct RetryExecutor {
    transport: Box<dyn Transport>,
    tokens: Box<dyn TokenProvider>,
    classifier: ErrorClassifier,
    policy: RetryPolicy,
    base_url: String,
    sleeper: Sleeper,
}

impl RetryExecutor {
    pub fn new(
        transport: impl Transport + 'static,
        tokens: impl TokenProvider + 'static,
        base_url: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            tokens: Box::new(tokens),
            classifier: ErrorClassifier::new(policy.max_retry_after),
            policy,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sleeper: Box::new(std::thread::sleep),
        }
    }

    /// Replace the real sleep, e.g. to record backoff delays
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute `method uri` after substituting `params` into the URI template.
    ///
    /// Absolute `https://` URIs (continuation links, operation monitors) are
    /// used as they are; anything else is relative to the base URL.
    pub fn execute(
        &self,
        method: Method,
        uri: &str,
        params: &UriArgs,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> SheetResult<HttpResponse> {
        let uri = expand_uri(uri, params)?;
        let url = self.url_for(&uri);
        let max_attempts = self.policy.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(method = %method, uri = %uri, attempt, "API request");

            let failure = match self.send_once(method, &url, body, headers)? {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if !self.classifier.decide(&failure).retry {
                return Err(self.classifier.permanent_error(&failure, &uri));
            }
            if attempt >= max_attempts {
                return Err(self.classifier.exhausted_error(&failure, attempt));
            }

            let delay = self.delay_for(&failure, attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                status = ?failure.http_status,
                "Retrying {} {}: {}",
                method,
                uri,
                failure.summary()
            );
            (self.sleeper)(delay);
        }
    }

    /// GET shorthand without parameters or extra headers
    pub fn get(&self, uri: &str, params: &UriArgs) -> SheetResult<Value> {
        self.execute(Method::Get, uri, params, None, &[])?.json()
    }

    fn url_for(&self, uri: &str) -> String {
        if uri.starts_with("https://") || uri.starts_with("http://") {
            uri.to_string()
        } else {
            format!("{}{}", self.base_url, uri)
        }
    }

    fn delay_for(&self, failure: &FailureDescription, attempt: u32) -> Duration {
        match (failure.http_status, failure.retry_after_seconds) {
            (Some(429), Some(secs)) => Duration::from_secs(secs),
            _ => self.policy.delay_for_attempt(attempt),
        }
    }

    /// One physical attempt. The outer error aborts immediately; the inner
    /// one is a failure to classify.
    fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> SheetResult<Result<HttpResponse, FailureDescription>> {
        let token = match self.tokens.access_token() {
            Ok(token) => token,
            Err(AuthError::Unreachable(msg)) => return Ok(Err(FailureDescription::connect(msg))),
            Err(AuthError::Rejected(msg)) => return Err(SheetError::Auth(msg)),
        };

        let mut request_headers = vec![
            ("Authorization".to_string(), format!("Bearer {}", token)),
            ("Accept".to_string(), "application/json".to_string()),
            ("client-request-id".to_string(), uuid::Uuid::new_v4().to_string()),
        ];
        request_headers.extend(
            headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: request_headers,
            body: body.cloned(),
        };

        Ok(match self.transport.send(&request) {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(FailureDescription::from_response(&response)),
            Err(TransportError::Connect(msg)) => Err(FailureDescription::connect(msg)),
            Err(TransportError::Other(msg)) => Err(FailureDescription {
                message: msg,
                ..Default::default()
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_millis(500));
        assert_eq!(policy.multiplier, 2.0);
        assert_eq!(policy.max_interval, Duration::from_millis(5000));
        assert_eq!(policy.max_attempts, 14);
        assert_eq!(policy.max_retry_after, Duration::from_secs(120));
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=6)
            .map(|attempt| policy.delay_for_attempt(attempt).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 5000, 5000]);
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(100), Duration::from_millis(5000));
    }

    #[test]
    fn test_builder() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_millis(10))
            .with_multiplier(3.0)
            .with_max_interval(Duration::from_millis(100))
            .with_max_attempts(0)
            .with_max_retry_after(Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(30));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(100));
        assert_eq!(policy.max_retry_after, Duration::from_secs(5));
    }
}
