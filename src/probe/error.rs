//! Failure taxonomy for a single connectivity test
//!
//! Every variant is converted into a `{success: false, error}` outcome by
//! [`super::ConnectionTester`]; none of them escape the admin endpoint.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Account {account_id} not found")]
    AccountLookup { account_id: String },

    #[error("Invalid proxy configuration: {0}")]
    ProxyConfiguration(String),

    #[error("Invalid model: model must be a non-empty string")]
    InvalidModel,

    #[error("Failed to connect to upstream: {0}")]
    UpstreamConnect(String),

    #[error("Upstream rejected the account credentials ({status}){}", body_suffix(.body))]
    UpstreamAuth { status: StatusCode, body: String },

    #[error("Upstream returned {status}{}", body_suffix(.body))]
    UpstreamStatus { status: StatusCode, body: String },

    #[error("Upstream did not start streaming within {timeout_ms} ms")]
    UpstreamTimeout { timeout_ms: u64 },

    #[error("Malformed stream start: {0}")]
    MalformedStream(String),

    #[error("Upstream sent an error event: {0}")]
    StreamError(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", body)
    }
}

/// Bounded label for failure metrics and HTTP status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    AccountLookup,
    ProxyConfiguration,
    InvalidModel,
    UpstreamConnect,
    UpstreamAuth,
    UpstreamStatus,
    UpstreamTimeout,
    MalformedStream,
    StreamError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::AccountLookup => "account_lookup",
            FailureReason::ProxyConfiguration => "proxy_configuration",
            FailureReason::InvalidModel => "invalid_model",
            FailureReason::UpstreamConnect => "upstream_connect",
            FailureReason::UpstreamAuth => "upstream_auth",
            FailureReason::UpstreamStatus => "upstream_status",
            FailureReason::UpstreamTimeout => "upstream_timeout",
            FailureReason::MalformedStream => "malformed_stream",
            FailureReason::StreamError => "stream_error",
        }
    }
}

impl ProbeError {
    pub fn reason(&self) -> FailureReason {
        match self {
            ProbeError::AccountLookup { .. } => FailureReason::AccountLookup,
            ProbeError::ProxyConfiguration(_) => FailureReason::ProxyConfiguration,
            ProbeError::InvalidModel => FailureReason::InvalidModel,
            ProbeError::UpstreamConnect(_) => FailureReason::UpstreamConnect,
            ProbeError::UpstreamAuth { .. } => FailureReason::UpstreamAuth,
            ProbeError::UpstreamStatus { .. } => FailureReason::UpstreamStatus,
            ProbeError::UpstreamTimeout { .. } => FailureReason::UpstreamTimeout,
            ProbeError::MalformedStream(_) => FailureReason::MalformedStream,
            ProbeError::StreamError(_) => FailureReason::StreamError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_without_body_has_no_suffix() {
        let err = ProbeError::UpstreamStatus {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "Upstream returned 502 Bad Gateway");
    }

    #[test]
    fn test_auth_error_includes_body() {
        let err = ProbeError::UpstreamAuth {
            status: StatusCode::UNAUTHORIZED,
            body: "invalid x-api-key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream rejected the account credentials (401 Unauthorized): invalid x-api-key"
        );
        assert_eq!(err.reason(), FailureReason::UpstreamAuth);
    }

    #[test]
    fn test_timeout_message_names_bound() {
        let err = ProbeError::UpstreamTimeout { timeout_ms: 1500 };
        assert!(err.to_string().contains("1500 ms"));
        assert_eq!(err.reason().as_str(), "upstream_timeout");
    }
}
