//! relayprobe - On-demand connectivity tester for upstream completion API accounts
//!
//! Given a configured account and a model identifier, relayprobe sends one
//! minimal streaming completion through the account's own credential, user
//! agent, and proxy, and reports whether the upstream began streaming.

pub mod account;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod probe;
pub mod telemetry;
