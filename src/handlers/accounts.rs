//! Account connectivity test endpoint
//!
//! `POST /admin/claude-console-accounts/{account_id}/test` with body
//! `{"model": "<model id>"}`.

use crate::error::AppError;
use crate::handlers::AppState;
use crate::middleware::request_id::RequestId;
use crate::probe::{FailureReason, TestOutcome};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};

const MODEL_REQUIRED: &str = "model is required";
const INVALID_JSON: &str = "request body must be valid JSON";

/// Model chosen by the admin for one test
///
/// Parsed by hand from the raw body so that a missing body, a missing field,
/// a non-string value, and a blank string all produce the same 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection(String);

impl ModelSelection {
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AppError::Validation(MODEL_REQUIRED.to_string()));
        }

        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|_| AppError::Validation(INVALID_JSON.to_string()))?;

        value
            .get("model")
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .map(|model| Self(model.to_string()))
            .ok_or_else(|| AppError::Validation(MODEL_REQUIRED.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// HTTP status reported for a finished test
pub fn status_for(outcome: &TestOutcome) -> StatusCode {
    match outcome.failure() {
        None => StatusCode::OK,
        Some(FailureReason::AccountLookup) => StatusCode::NOT_FOUND,
        Some(FailureReason::ProxyConfiguration) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(FailureReason::UpstreamTimeout) => StatusCode::GATEWAY_TIMEOUT,
        Some(FailureReason::InvalidModel) => StatusCode::BAD_REQUEST,
        Some(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Run a connectivity test for one account
///
/// Validation happens before the tester is touched: a rejected body performs
/// no account lookup and no network activity.
pub async fn test_connection(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(account_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<TestOutcome>), AppError> {
    let model = ModelSelection::from_body(&body).inspect_err(|e| {
        tracing::debug!(
            request_id = %request_id,
            account_id = %account_id,
            error = %e,
            "Rejected connectivity test request"
        );
    })?;

    tracing::info!(
        request_id = %request_id,
        account_id = %account_id,
        model = %model.as_str(),
        "Connectivity test requested"
    );

    let outcome = state
        .tester()
        .test_connection(&account_id, model.as_str())
        .await;

    let status = status_for(&outcome);
    tracing::debug!(
        request_id = %request_id,
        account_id = %account_id,
        success = outcome.success(),
        status = status.as_u16(),
        "Connectivity test finished"
    );

    Ok((status, Json(outcome)))
}
