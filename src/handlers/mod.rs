//! HTTP request handlers for the relayprobe admin API

use crate::account::ConfigAccountStore;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::{admin_auth::require_admin_token, request_id::request_id_middleware};
use crate::probe::{ConnectionTester, HttpStreamSender};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod accounts;
pub mod health;
pub mod metrics;
pub mod models;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    tester: Arc<ConnectionTester>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState from configuration
    ///
    /// Wires the config-backed account store and the `reqwest` sender into
    /// a [`ConnectionTester`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if metrics registration fails.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let metrics = Arc::new(Metrics::new().map_err(|e| {
            AppError::Internal(format!("Failed to initialize metrics: {}", e))
        })?);

        let accounts = Arc::new(ConfigAccountStore::new(config.accounts.iter().cloned()));
        let sender = Arc::new(HttpStreamSender::new(config.probe.sender_settings()));
        let tester = ConnectionTester::new(accounts, sender)
            .with_default_user_agent(config.probe.default_user_agent.clone())
            .with_metrics(metrics.clone());

        Ok(Self::with_tester(config, Arc::new(tester), metrics))
    }

    /// Build state around an already-assembled tester
    pub fn with_tester(
        config: Arc<Config>,
        tester: Arc<ConnectionTester>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            tester,
            metrics,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tester(&self) -> &ConnectionTester {
        &self.tester
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the full application router
///
/// `/admin/*` routes sit behind the admin token check; `/health` and
/// `/metrics` are open. Every response carries an `x-request-id` header.
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/claude-console-accounts/{account_id}/test",
            post(accounts::test_connection),
        )
        .route("/models", get(models::handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    Router::new()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .nest("/admin", admin)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
