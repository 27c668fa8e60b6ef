//! Prometheus metrics collection for relayprobe
//!
//! This module provides metrics instrumentation for tracking:
//! - Connectivity test counts by outcome and auth scheme
//! - Failure counts by reason
//! - Connectivity test latency
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use crate::probe::{AuthScheme, FailureReason};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Test outcome enum for type-safe metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

impl Outcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Failed => "failed",
        }
    }
}

/// Metrics collector for relayprobe
///
/// All label values come from closed enums, so cardinality is bounded
/// regardless of how many accounts are configured. Account ids are never
/// used as labels.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    tests_total: IntCounterVec,
    test_failures: IntCounterVec,
    test_duration: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 2 outcomes × 3 schemes (bearer, x_api_key, none) = 6 series
        let tests_total = IntCounterVec::new(
            Opts::new(
                "relayprobe_connection_tests_total",
                "Total number of account connectivity tests by outcome and auth scheme",
            ),
            &["outcome", "auth_scheme"],
        )?;

        let test_failures = IntCounterVec::new(
            Opts::new(
                "relayprobe_connection_test_failures_total",
                "Total number of failed connectivity tests by failure reason",
            ),
            &["reason"],
        )?;

        let test_duration = HistogramVec::new(
            HistogramOpts::new(
                "relayprobe_connection_test_duration_ms",
                "Connectivity test latency (start to first stream signal or failure) in milliseconds",
            )
            .buckets(vec![
                10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
            ]),
            &["outcome"],
        )?;

        registry.register(Box::new(tests_total.clone()))?;
        registry.register(Box::new(test_failures.clone()))?;
        registry.register(Box::new(test_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            tests_total,
            test_failures,
            test_duration,
        })
    }

    /// Record one finished connectivity test
    ///
    /// `scheme` is `None` when the test failed before the account resolved.
    pub fn record_test(
        &self,
        outcome: Outcome,
        scheme: Option<AuthScheme>,
        reason: Option<FailureReason>,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        let scheme_label = scheme.map(|s| s.as_str()).unwrap_or("none");

        self.tests_total
            .get_metric_with_label_values(&[outcome.as_str(), scheme_label])?
            .inc();

        if let Some(reason) = reason {
            self.test_failures
                .get_metric_with_label_values(&[reason.as_str()])?
                .inc();
        }

        self.test_duration
            .get_metric_with_label_values(&[outcome.as_str()])?
            .observe(duration_ms);

        Ok(())
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("metrics output is not valid UTF-8: {}", e))
        })
    }
}
