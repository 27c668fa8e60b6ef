//! Admin token check for `/admin/*` routes
//!
//! When `admin.token` is configured, requests must carry
//! `Authorization: Bearer <token>`. When it is not configured the routes are
//! open and authentication is left to whatever fronts the service.

use crate::error::AppError;
use crate::handlers::AppState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

/// Reject admin requests that do not present the configured token
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config().admin.token.as_deref() else {
        return next.run(request).await;
    };

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()));

    if authorized {
        return next.run(request).await;
    }

    tracing::warn!(
        uri = %request.uri().path(),
        "Rejected admin request with missing or invalid token"
    );
    AppError::Unauthorized.into_response()
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
