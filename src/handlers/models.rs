//! Model catalog endpoint
//!
//! Exposes the Claude models offered to admins when picking a test model via
//! GET /admin/models

use axum::Json;
use serde::Serialize;

/// One selectable model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Claude models in display order
pub const CLAUDE_MODELS: [ModelOption; 5] = [
    ModelOption {
        value: "claude-opus-4-6",
        label: "Claude Opus 4.6",
    },
    ModelOption {
        value: "claude-sonnet-4-6",
        label: "Claude Sonnet 4.6",
    },
    ModelOption {
        value: "claude-opus-4-5-20251101",
        label: "Claude Opus 4.5",
    },
    ModelOption {
        value: "claude-sonnet-4-5-20250929",
        label: "Claude Sonnet 4.5",
    },
    ModelOption {
        value: "claude-haiku-4-5-20251001",
        label: "Claude Haiku 4.5",
    },
];

/// Response for GET /admin/models
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: &'static [ModelOption],
}

/// GET /admin/models handler
pub async fn handler() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: &CLAUDE_MODELS,
    })
}
