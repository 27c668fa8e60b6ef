//! Upstream connectivity testing
//!
//! Selects the auth scheme from the credential, builds a minimal streaming
//! request, routes it through the account's transport, and judges whether the
//! upstream began streaming.

pub mod auth;
pub mod error;
pub mod payload;
pub mod redact;
pub mod sender;
pub mod tester;
pub mod transport;

pub use auth::{AuthScheme, UpstreamAuth};
pub use error::{FailureReason, ProbeError};
pub use payload::{ClaudeTestPayload, PayloadBuilder, PayloadOptions, TestPayload, build_test_payload};
pub use sender::{
    HttpStreamSender, SenderSettings, StreamCriterion, StreamSender, StreamStart, TestRequest,
};
pub use tester::{ConnectionTester, ProbePhase, TestOutcome};
pub use transport::{ProxyTransportResolver, Transport, TransportResolver};
