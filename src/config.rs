//! Configuration management for relayprobe
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Accounts are declared inline as `[[accounts]]` tables.

use crate::account::Account;
use crate::probe::{ProxyTransportResolver, SenderSettings, StreamCriterion, TransportResolver};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Upper bound for `probe.timeout_ms` (5 minutes)
pub const MAX_TIMEOUT_MS: u64 = 300_000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Connectivity test tunables
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Bound on connect plus first stream signal
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub stream_criterion: StreamCriterion,
    #[serde(default = "default_max_first_event_bytes")]
    pub max_first_event_bytes: usize,
    #[serde(default = "default_max_error_body_bytes")]
    pub max_error_body_bytes: usize,
    /// Used when an account does not carry its own `user_agent`
    #[serde(default = "default_user_agent")]
    pub default_user_agent: String,
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_max_first_event_bytes() -> usize {
    64 * 1024
}

fn default_max_error_body_bytes() -> usize {
    2048
}

fn default_user_agent() -> String {
    crate::probe::tester::DEFAULT_USER_AGENT.to_string()
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            stream_criterion: StreamCriterion::default(),
            max_first_event_bytes: default_max_first_event_bytes(),
            max_error_body_bytes: default_max_error_body_bytes(),
            default_user_agent: default_user_agent(),
            anthropic_version: default_anthropic_version(),
        }
    }
}

impl ProbeConfig {
    /// Convert to the sender's runtime settings
    pub fn sender_settings(&self) -> SenderSettings {
        SenderSettings {
            timeout: Duration::from_millis(self.timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            criterion: self.stream_criterion,
            max_first_event_bytes: self.max_first_event_bytes,
            max_error_body_bytes: self.max_error_body_bytes,
            anthropic_version: self.anthropic_version.clone(),
        }
    }
}

/// Admin surface configuration
///
/// When `token` is set, every `/admin/*` route requires
/// `Authorization: Bearer <token>`.
#[derive(Clone, Default, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub token: Option<String>,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// - `ConfigFileRead` when the file cannot be read
    /// - `ConfigParseFailed` when the TOML is malformed or mistyped
    /// - `ConfigValidationFailed` when [`Config::validate`] rejects the values
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        config.warn_unresolvable_proxies();

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Proxy settings are not checked here. An account with a
    /// broken proxy still loads; its connectivity test reports the problem.
    pub fn validate(&self) -> crate::error::AppResult<()> {
        if self.server.port == 0 {
            return Err(crate::error::AppError::Config(
                "server.port must be non-zero".to_string(),
            ));
        }

        let probe = &self.probe;
        if probe.timeout_ms == 0 || probe.timeout_ms > MAX_TIMEOUT_MS {
            return Err(crate::error::AppError::Config(format!(
                "probe.timeout_ms={} is out of range. Must be between 1 and {} milliseconds.",
                probe.timeout_ms, MAX_TIMEOUT_MS
            )));
        }
        if probe.connect_timeout_ms == 0 || probe.connect_timeout_ms > probe.timeout_ms {
            return Err(crate::error::AppError::Config(format!(
                "probe.connect_timeout_ms={} is out of range. Must be between 1 and \
                probe.timeout_ms ({}).",
                probe.connect_timeout_ms, probe.timeout_ms
            )));
        }
        if probe.max_first_event_bytes == 0 {
            return Err(crate::error::AppError::Config(
                "probe.max_first_event_bytes must be greater than 0".to_string(),
            ));
        }
        if probe.default_user_agent.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "probe.default_user_agent cannot be empty".to_string(),
            ));
        }
        if probe.anthropic_version.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "probe.anthropic_version cannot be empty".to_string(),
            ));
        }

        if let Some(token) = &self.admin.token
            && token.trim().is_empty()
        {
            return Err(crate::error::AppError::Config(
                "admin.token is set but empty. Remove it to disable admin authentication."
                    .to_string(),
            ));
        }

        let level = self.observability.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(crate::error::AppError::Config(format!(
                "observability.log_level '{}' is invalid. Expected one of: {}",
                self.observability.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        let mut seen = HashSet::new();
        for (index, account) in self.accounts.iter().enumerate() {
            validate_account(index, account)?;
            if !seen.insert(account.id()) {
                return Err(crate::error::AppError::Config(format!(
                    "Duplicate account id '{}'. Account ids must be unique.",
                    account.id()
                )));
            }
        }

        Ok(())
    }

    /// Log a warning for every account whose proxy would fail to resolve
    pub fn warn_unresolvable_proxies(&self) {
        let resolver = ProxyTransportResolver;
        for account in &self.accounts {
            let Some(proxy) = account.proxy() else {
                continue;
            };
            if let Err(err) = resolver.resolve(Some(proxy)) {
                let message = crate::probe::redact::scrub(&err.to_string(), &account.secrets());
                tracing::warn!(
                    account_id = %account.id(),
                    error = %message,
                    "Account proxy is not usable; its connectivity tests will fail"
                );
            }
        }
    }
}

fn validate_account(index: usize, account: &Account) -> crate::error::AppResult<()> {
    if account.id().trim().is_empty() {
        return Err(crate::error::AppError::Config(format!(
            "accounts[{}] has an empty id",
            index
        )));
    }
    if account.name().trim().is_empty() {
        return Err(crate::error::AppError::Config(format!(
            "Account '{}' has an empty name",
            account.id()
        )));
    }
    if account.api_key().trim().is_empty() {
        return Err(crate::error::AppError::Config(format!(
            "Account '{}' has an empty api_key",
            account.id()
        )));
    }

    let url = Url::parse(account.api_url()).map_err(|e| {
        crate::error::AppError::Config(format!(
            "Account '{}' has invalid api_url '{}': {}",
            account.id(),
            account.api_url(),
            e
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(crate::error::AppError::Config(format!(
            "Account '{}' has invalid api_url '{}'. Must be an absolute http:// or https:// URL.",
            account.id(),
            account.api_url()
        )));
    }

    Ok(())
}
