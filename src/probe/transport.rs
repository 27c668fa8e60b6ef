//! Network path resolution for a test request
//!
//! An account either connects directly or through its configured forward
//! proxy. A proxy that cannot be resolved fails the test; it never degrades
//! to a direct connection, which would report reachability the real traffic
//! path does not have.

use crate::account::ProxyConfig;
use crate::probe::ProbeError;
use reqwest::Url;
use std::fmt;

/// Proxy schemes accepted in account configuration
pub const SUPPORTED_PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Resolved network path for one test
#[derive(Clone)]
pub enum Transport {
    Direct,
    Proxied {
        proxy: reqwest::Proxy,
        /// `scheme://host:port`, without credentials
        label: String,
    },
}

impl Transport {
    pub fn is_direct(&self) -> bool {
        matches!(self, Transport::Direct)
    }

    /// Credential-free description for logs
    pub fn label(&self) -> &str {
        match self {
            Transport::Direct => "direct",
            Transport::Proxied { label, .. } => label,
        }
    }

    /// Client builder wired for this path
    ///
    /// Direct transport disables environment proxies so `HTTP_PROXY` and
    /// friends cannot reroute the test.
    pub fn client_builder(&self) -> reqwest::ClientBuilder {
        let builder = reqwest::Client::builder();
        match self {
            Transport::Direct => builder.no_proxy(),
            Transport::Proxied { proxy, .. } => builder.proxy(proxy.clone()),
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport({})", self.label())
    }
}

/// Turns an account's proxy configuration into a [`Transport`]
pub trait TransportResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns `ProxyConfiguration` when `proxy` is present but unusable.
    fn resolve(&self, proxy: Option<&ProxyConfig>) -> Result<Transport, ProbeError>;
}

/// Default resolver backed by `reqwest::Proxy`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyTransportResolver;

impl TransportResolver for ProxyTransportResolver {
    fn resolve(&self, proxy: Option<&ProxyConfig>) -> Result<Transport, ProbeError> {
        match proxy {
            None => Ok(Transport::Direct),
            Some(config) => resolve_proxy(config),
        }
    }
}

fn resolve_proxy(config: &ProxyConfig) -> Result<Transport, ProbeError> {
    let scheme = config.scheme().trim().to_ascii_lowercase();
    if !SUPPORTED_PROXY_SCHEMES.contains(&scheme.as_str()) {
        return Err(ProbeError::ProxyConfiguration(format!(
            "unsupported proxy scheme '{}' (expected one of: {})",
            config.scheme(),
            SUPPORTED_PROXY_SCHEMES.join(", ")
        )));
    }

    let host = config.host().trim();
    if host.is_empty() {
        return Err(ProbeError::ProxyConfiguration(
            "proxy host is empty".to_string(),
        ));
    }
    if host.contains(|c: char| c.is_whitespace() || c == '/' || c == '@') {
        return Err(ProbeError::ProxyConfiguration(format!(
            "proxy host '{}' is not a valid hostname",
            host
        )));
    }
    if config.port() == 0 {
        return Err(ProbeError::ProxyConfiguration(
            "proxy port must be non-zero".to_string(),
        ));
    }

    // Bare IPv6 literals need brackets inside a URL authority
    let authority_host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };
    let label = format!("{}://{}:{}", scheme, authority_host, config.port());

    let mut url = Url::parse(&label).map_err(|e| {
        ProbeError::ProxyConfiguration(format!("proxy address '{}' is invalid: {}", label, e))
    })?;

    match (config.username(), config.password()) {
        (None, None) => {}
        (None, Some(_)) => {
            return Err(ProbeError::ProxyConfiguration(
                "proxy password is set without a username".to_string(),
            ));
        }
        (Some(username), password) => {
            if username.is_empty() {
                return Err(ProbeError::ProxyConfiguration(
                    "proxy username is empty".to_string(),
                ));
            }
            url.set_username(username).map_err(|_| {
                ProbeError::ProxyConfiguration("proxy username cannot be applied".to_string())
            })?;
            url.set_password(password).map_err(|_| {
                ProbeError::ProxyConfiguration("proxy password cannot be applied".to_string())
            })?;
        }
    }

    let proxy = reqwest::Proxy::all(url).map_err(|e| {
        ProbeError::ProxyConfiguration(format!("proxy '{}' rejected: {}", label, e))
    })?;

    Ok(Transport::Proxied { proxy, label })
}
