//! Connectivity test orchestration
//!
//! Runs one account-against-model test:
//! `Idle -> ResolvingAccount -> BuildingRequest -> Connecting -> {Streaming -> Succeeded} | Failed`.
//! Every failure is converted into a [`TestOutcome`]; nothing propagates to
//! the caller and nothing is retried.

use crate::account::{Account, AccountLookup};
use crate::metrics::{Metrics, Outcome};
use crate::probe::auth::{AuthScheme, UpstreamAuth};
use crate::probe::payload::{ClaudeTestPayload, PayloadBuilder, PayloadOptions};
use crate::probe::redact::scrub;
use crate::probe::sender::{StreamSender, TestRequest};
use crate::probe::transport::{ProxyTransportResolver, TransportResolver};
use crate::probe::{FailureReason, ProbeError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// User agent sent when neither the account nor the config provides one
pub const DEFAULT_USER_AGENT: &str = "claude-cli/1.0.119 (external, cli)";

/// Lifecycle of a single test invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePhase {
    Idle,
    ResolvingAccount,
    BuildingRequest,
    Connecting,
    Streaming,
    Succeeded,
    Failed,
}

impl ProbePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbePhase::Idle => "idle",
            ProbePhase::ResolvingAccount => "resolving_account",
            ProbePhase::BuildingRequest => "building_request",
            ProbePhase::Connecting => "connecting",
            ProbePhase::Streaming => "streaming",
            ProbePhase::Succeeded => "succeeded",
            ProbePhase::Failed => "failed",
        }
    }
}

impl fmt::Display for ProbePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one connectivity test, as reported to the admin caller
///
/// Serializes to `{"success": true, "accountId": ...}` or
/// `{"success": false, "accountId": ..., "error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    success: bool,
    account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip)]
    failure: Option<FailureReason>,
}

impl TestOutcome {
    pub fn succeeded(account_id: impl Into<String>) -> Self {
        Self {
            success: true,
            account_id: account_id.into(),
            error: None,
            failure: None,
        }
    }

    pub fn failed(
        account_id: impl Into<String>,
        reason: FailureReason,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            account_id: account_id.into(),
            error: Some(error.into()),
            failure: Some(reason),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn failure(&self) -> Option<FailureReason> {
        self.failure
    }
}

/// Tests one account's upstream path on demand
///
/// Collaborators are trait objects so the store, payload builder, proxy
/// resolver, and network sender can each be replaced independently.
pub struct ConnectionTester {
    accounts: Arc<dyn AccountLookup>,
    payloads: Arc<dyn PayloadBuilder>,
    transports: Arc<dyn TransportResolver>,
    sender: Arc<dyn StreamSender>,
    default_user_agent: String,
    metrics: Option<Arc<Metrics>>,
}

impl ConnectionTester {
    /// Create a tester with the default payload builder and proxy resolver
    pub fn new(accounts: Arc<dyn AccountLookup>, sender: Arc<dyn StreamSender>) -> Self {
        Self {
            accounts,
            payloads: Arc::new(ClaudeTestPayload),
            transports: Arc::new(ProxyTransportResolver),
            sender,
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
            metrics: None,
        }
    }

    pub fn with_payload_builder(mut self, payloads: Arc<dyn PayloadBuilder>) -> Self {
        self.payloads = payloads;
        self
    }

    pub fn with_transport_resolver(mut self, transports: Arc<dyn TransportResolver>) -> Self {
        self.transports = transports;
        self
    }

    pub fn with_default_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.default_user_agent = user_agent.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Test that `model` is reachable through the account's configured path
    ///
    /// Never fails: every error is reported in the returned outcome with
    /// credentials scrubbed from the message.
    pub async fn test_connection(&self, account_id: &str, model: &str) -> TestOutcome {
        let started = Instant::now();
        tracing::debug!(
            account_id = %account_id,
            model = %model,
            from = %ProbePhase::Idle,
            phase = %ProbePhase::ResolvingAccount,
            "Starting connectivity test"
        );

        let account = match self.accounts.get(account_id).await {
            Ok(account) => account,
            Err(err) => {
                return self.fail(
                    account_id,
                    model,
                    ProbePhase::ResolvingAccount,
                    None,
                    &[],
                    err,
                    started,
                );
            }
        };

        let auth = UpstreamAuth::from_api_key(account.api_key());
        let scheme = auth.scheme();

        tracing::debug!(
            account_id = %account_id,
            account_name = %account.name(),
            auth_scheme = scheme.as_str(),
            phase = %ProbePhase::BuildingRequest,
            "Account resolved"
        );

        let request = match self.build_request(&account, model, auth) {
            Ok(request) => request,
            Err(err) => {
                return self.fail(
                    account_id,
                    model,
                    ProbePhase::BuildingRequest,
                    Some(scheme),
                    &account.secrets(),
                    err,
                    started,
                );
            }
        };

        tracing::debug!(
            account_id = %account_id,
            transport = request.transport.label(),
            phase = %ProbePhase::Connecting,
            "Opening upstream stream"
        );

        match self.sender.send(request).await {
            Ok(signal) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                tracing::info!(
                    account_id = %account_id,
                    model = %model,
                    auth_scheme = scheme.as_str(),
                    first_signal = ?signal,
                    latency_ms = %latency_ms,
                    phase = %ProbePhase::Succeeded,
                    "Connectivity test succeeded"
                );
                self.record(Outcome::Succeeded, Some(scheme), None, latency_ms);
                TestOutcome::succeeded(account_id)
            }
            Err(err) => {
                let phase = match &err {
                    ProbeError::MalformedStream(_) | ProbeError::StreamError(_) => {
                        ProbePhase::Streaming
                    }
                    _ => ProbePhase::Connecting,
                };
                self.fail(
                    account_id,
                    model,
                    phase,
                    Some(scheme),
                    &account.secrets(),
                    err,
                    started,
                )
            }
        }
    }

    fn build_request(
        &self,
        account: &Account,
        model: &str,
        auth: UpstreamAuth,
    ) -> Result<TestRequest, ProbeError> {
        let payload = self
            .payloads
            .build(model, PayloadOptions { stream: true })?;
        let transport = self.transports.resolve(account.proxy())?;
        let user_agent = account
            .user_agent()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or(self.default_user_agent.as_str())
            .to_string();

        Ok(TestRequest {
            base_url: account.api_url().to_string(),
            payload,
            auth,
            transport,
            user_agent,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn fail(
        &self,
        account_id: &str,
        model: &str,
        phase: ProbePhase,
        scheme: Option<AuthScheme>,
        secrets: &[&str],
        err: ProbeError,
        started: Instant,
    ) -> TestOutcome {
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let reason = err.reason();
        let message = scrub(&err.to_string(), secrets);

        tracing::warn!(
            account_id = %account_id,
            model = %model,
            failed_in = %phase,
            phase = %ProbePhase::Failed,
            error_kind = reason.as_str(),
            error = %message,
            latency_ms = %latency_ms,
            "Connectivity test failed"
        );

        self.record(Outcome::Failed, scheme, Some(reason), latency_ms);
        TestOutcome::failed(account_id, reason, message)
    }

    fn record(
        &self,
        outcome: Outcome,
        scheme: Option<AuthScheme>,
        reason: Option<FailureReason>,
        latency_ms: f64,
    ) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        if let Err(e) = metrics.record_test(outcome, scheme, reason, latency_ms) {
            tracing::warn!(
                error = %e,
                outcome = outcome.as_str(),
                "Failed to record connectivity test metrics"
            );
        }
    }
}
