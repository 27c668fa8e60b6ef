//! Authentication scheme selection from credential shape
//!
//! Vendor-native keys (`sk-ant-...`) authenticate with an `x-api-key` header;
//! anything else is treated as an exchange-issued bearer token. The choice is
//! made once per test and carried as a tagged variant, so a request can never
//! hold both headers or neither.

use crate::probe::ProbeError;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use std::fmt;

/// Key prefix that selects header-injection mode
pub const API_KEY_PREFIX: &str = "sk-ant-";

/// Header used in header-injection mode
pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

#[derive(Clone, PartialEq, Eq)]
pub enum UpstreamAuth {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `x-api-key: <token>`
    ApiKeyHeader(String),
}

/// Credential-free label for logs and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    ApiKeyHeader,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Bearer => "bearer",
            AuthScheme::ApiKeyHeader => "x_api_key",
        }
    }
}

impl UpstreamAuth {
    /// Pick the auth strategy for an account credential
    pub fn from_api_key(api_key: &str) -> Self {
        if api_key.starts_with(API_KEY_PREFIX) {
            UpstreamAuth::ApiKeyHeader(api_key.to_string())
        } else {
            UpstreamAuth::Bearer(api_key.to_string())
        }
    }

    pub fn scheme(&self) -> AuthScheme {
        match self {
            UpstreamAuth::Bearer(_) => AuthScheme::Bearer,
            UpstreamAuth::ApiKeyHeader(_) => AuthScheme::ApiKeyHeader,
        }
    }

    /// The single header this strategy contributes, marked sensitive
    ///
    /// # Errors
    ///
    /// Returns `UpstreamConnect` if the credential contains bytes that are not
    /// legal in an HTTP header value. The credential itself is not included.
    pub fn header(&self) -> Result<(HeaderName, HeaderValue), ProbeError> {
        let (name, raw) = match self {
            UpstreamAuth::Bearer(token) => (AUTHORIZATION, format!("Bearer {}", token)),
            UpstreamAuth::ApiKeyHeader(token) => (X_API_KEY, token.clone()),
        };
        let mut value = HeaderValue::from_str(&raw).map_err(|_| {
            ProbeError::UpstreamConnect(
                "account credential contains characters not allowed in an HTTP header".to_string(),
            )
        })?;
        value.set_sensitive(true);
        Ok((name, value))
    }
}

impl fmt::Debug for UpstreamAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamAuth::Bearer(_) => f.write_str("Bearer([REDACTED])"),
            UpstreamAuth::ApiKeyHeader(_) => f.write_str("ApiKeyHeader([REDACTED])"),
        }
    }
}
