//! Failure classification: retry, or surface a typed error
//!
//! Used identically for single calls (by the retry executor) and for every
//! failed sub-response of a batch (by the multiplexer).

use super::transport::HttpResponse;
use crate::error::SheetError;
use crate::format::truncate;
use serde_json::Value;
use std::time::Duration;

/// HTTP statuses that are retried.
///
/// 405 shows up transiently right after a new worksheet is created, before
/// the change has propagated.
pub const RETRY_HTTP_CODES: [u16; 6] = [405, 409, 500, 502, 503, 504];

/// Message fragments that mark a transient server-side condition
pub const RETRY_MESSAGES: [&str; 2] = [
    "There were communication or server problems",
    "EditModeCannotAcquireLockTooManyRequests",
];

const TOO_MANY_REQUESTS: u16 = 429;

const MAX_RAW_MESSAGE_CHARS: usize = 500;

/// What went wrong with one remote call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureDescription {
    pub http_status: Option<u16>,
    pub vendor_error_code: Option<String>,
    pub message: String,
    pub is_connect_failure: bool,
    pub retry_after_seconds: Option<u64>,
}

impl FailureDescription {
    /// Describe a non-2xx response of a single call
    pub fn from_response(response: &HttpResponse) -> Self {
        let body = serde_json::from_str::<Value>(&response.body).unwrap_or(Value::Null);
        let (code, message) = vendor_error(&body);
        Self {
            http_status: Some(response.status),
            vendor_error_code: code,
            message: message.unwrap_or_else(|| truncate(&response.body, MAX_RAW_MESSAGE_CHARS)),
            is_connect_failure: false,
            retry_after_seconds: response.retry_after_seconds(),
        }
    }

    /// Describe a non-2xx sub-response inside a batch
    pub fn from_sub_response(status: u16, body: &Value) -> Self {
        let (code, message) = vendor_error(body);
        Self {
            http_status: Some(status),
            vendor_error_code: code,
            message: message.unwrap_or_default(),
            is_connect_failure: false,
            retry_after_seconds: None,
        }
    }

    /// Describe a DNS/connect failure to the identity or API endpoint
    pub fn connect(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_connect_failure: true,
            ..Default::default()
        }
    }

    fn has_code(&self, code: &str) -> bool {
        self.vendor_error_code
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(code))
    }

    fn mentions_transient_condition(&self) -> bool {
        let code = self.vendor_error_code.as_deref().unwrap_or_default();
        RETRY_MESSAGES
            .iter()
            .any(|fragment| code.contains(fragment) || self.message.contains(fragment))
    }

    /// `Code: message`, the way the API reports errors
    pub fn summary(&self) -> String {
        match &self.vendor_error_code {
            Some(code) => format!("{}: {}", capitalize(code), self.message),
            None => self.message.clone(),
        }
    }
}

/// Outcome of classifying one failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
}

#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    max_retry_after: Duration,
}

impl ErrorClassifier {
    /// `max_retry_after` is the longest server-requested wait still honored
    pub fn new(max_retry_after: Duration) -> Self {
        Self { max_retry_after }
    }

    pub fn max_retry_after(&self) -> Duration {
        self.max_retry_after
    }

    pub fn decide(&self, failure: &FailureDescription) -> RetryDecision {
        let retry = if failure.is_connect_failure {
            true
        } else if failure.http_status == Some(TOO_MANY_REQUESTS) {
            !self.exceeds_ceiling(failure)
        } else if failure
            .http_status
            .is_some_and(|status| RETRY_HTTP_CODES.contains(&status))
        {
            true
        } else {
            failure.mentions_transient_condition()
        };

        RetryDecision { retry }
    }

    fn exceeds_ceiling(&self, failure: &FailureDescription) -> bool {
        failure
            .retry_after_seconds
            .is_some_and(|secs| Duration::from_secs(secs) > self.max_retry_after)
    }

    /// Typed error for a single call that must not (or can no longer) be retried
    pub fn permanent_error(&self, failure: &FailureDescription, uri: &str) -> SheetError {
        let Some(status) = failure.http_status else {
            return SheetError::Transport(failure.message.clone());
        };

        if status == TOO_MANY_REQUESTS && self.exceeds_ceiling(failure) {
            return SheetError::TooManyRequestsExceededCeiling {
                retry_after_secs: failure.retry_after_seconds.unwrap_or_default(),
                ceiling_secs: self.max_retry_after.as_secs(),
            };
        }

        if failure.has_code("accessDenied")
            && failure.message == "Could not obtain a WAC access token."
        {
            return SheetError::UnsupportedFileType(format!(
                "It looks like the specified file is not in the \"XLSX\" Excel format. Error: \"{}\"",
                failure.summary()
            ));
        }

        if failure.has_code("itemNotFound") || status == 404 {
            return SheetError::ResourceNotFound(format!(
                "The resource could not be found. Uri: \"{}\"",
                uri
            ));
        }

        if failure.has_code("badRequest") || status == 400 {
            return SheetError::BadRequest(failure.summary());
        }

        SheetError::Remote {
            status,
            code: failure.vendor_error_code.clone(),
            message: failure.message.clone(),
            uri: uri.to_string(),
        }
    }

    /// Error for a retryable condition that ran out of attempts
    pub fn exhausted_error(&self, failure: &FailureDescription, attempts: u32) -> SheetError {
        SheetError::TransientRemoteFailure {
            attempts,
            status: failure.http_status,
            message: failure.summary(),
        }
    }

    /// Typed error for a failed batch sub-response; vendor codes win over status
    pub fn sub_response_error(&self, failure: &FailureDescription, uri: &str) -> SheetError {
        let status = failure.http_status.unwrap_or_default();

        if failure.has_code("GenericFileOpenError")
            || failure.has_code("EditModeCannotAcquireLock")
            || failure.has_code("resourceLocked")
        {
            return SheetError::RemoteLockedOrBusy(failure.message.clone());
        }

        if failure.has_code("serviceNotAvailable")
            || (failure.has_code("UnknownError") && status == 503)
        {
            return SheetError::RemoteServiceUnavailable(failure.message.clone());
        }

        if failure.has_code("MaxRequestDurationExceeded") {
            return SheetError::RemoteRequestTooSlow(failure.message.clone());
        }

        SheetError::GenericBatchFailure {
            status,
            code: failure.vendor_error_code.clone().unwrap_or_default(),
            message: failure.message.clone(),
            uri: uri.to_string(),
            retryable: self.decide(failure).retry,
        }
    }
}

/// `{"error": {"code": ..., "message": ...}}`
fn vendor_error(body: &Value) -> (Option<String>, Option<String>) {
    let error = &body["error"];
    let code = error["code"].as_str().map(str::to_string);
    let message = error["message"].as_str().map(str::to_string);
    (code, message)
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
