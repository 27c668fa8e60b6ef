//! Upstream account records and lookup
//!
//! An [`Account`] is one upstream API identity: base URL, credential, and the
//! network path used to reach it. The connectivity tester only reads accounts;
//! it resolves them through the [`AccountLookup`] trait so the store can be
//! swapped for a test double or an external backend.

pub mod store;

pub use store::ConfigAccountStore;

use crate::probe::ProbeError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// Resolves an opaque account identifier to an [`Account`]
///
/// Implementations must return [`ProbeError::AccountLookup`] when the
/// identifier does not resolve.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn get(&self, account_id: &str) -> Result<Account, ProbeError>;
}

/// Stored credential and network configuration for one upstream identity
///
/// Fields are private; accounts are created via deserialization (config
/// file) or [`Account::new`]. `Debug` never prints the credential.
#[derive(Clone, Deserialize)]
pub struct Account {
    id: String,
    name: String,
    api_url: String,
    api_key: String,
    #[serde(default)]
    proxy: Option<ProxyConfig>,
    #[serde(default)]
    user_agent: Option<String>,
}

impl Account {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            proxy: None,
            user_agent: None,
        }
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// The raw credential. Never log or echo this value.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Secret values that must be scrubbed from any outgoing diagnostic
    pub fn secrets(&self) -> Vec<&str> {
        let mut secrets = vec![self.api_key.as_str()];
        if let Some(password) = self.proxy.as_ref().and_then(|p| p.password()) {
            secrets.push(password);
        }
        secrets
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Forward-proxy settings attached to an account
///
/// Stored unvalidated. A malformed proxy fails the account's test in the
/// transport resolver, never at load time.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    #[serde(alias = "type")]
    scheme: String,
    host: String,
    port: u16,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl ProxyConfig {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
