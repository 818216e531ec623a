// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses, plus the
//! provider outcome taxonomy used by the pipeline.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default delay suggested for transient upstream failures.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Upstream(msg) => {
                (StatusCode::BAD_GATEWAY, "upstream_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

// ─── Provider Outcomes ──────────────────────────────────────────────────────

/// Non-normal outcomes a provider can signal to the orchestrator.
///
/// `Halt` and `WaitForInput` are expected business outcomes rather than
/// failures; they travel on the error path so `?` short-circuits them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Activity must not proceed (terminal SKIPPED).
    #[error("Pipeline halted: {reason}")]
    Halt {
        reason: String,
        metadata: HashMap<String, String>,
    },

    /// A human must supply data (terminal WAITING).
    #[error("Waiting for input on {key}: {required_fields:?}")]
    WaitForInput {
        key: String,
        required_fields: Vec<String>,
    },

    /// Transient failure; the whole run is discarded and retried later.
    #[error("Retryable ({}s): {reason}", delay.as_secs())]
    Retryable { delay: Duration, reason: String },

    /// Misconfiguration or unrecoverable state (terminal FAILED).
    #[error("Fatal: {0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn halt(reason: impl Into<String>) -> Self {
        ProviderError::Halt {
            reason: reason.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn retryable(reason: impl Into<String>) -> Self {
        ProviderError::Retryable {
            delay: DEFAULT_RETRY_DELAY,
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Retryable { .. })
    }
}

impl From<AppError> for ProviderError {
    fn from(err: AppError) -> Self {
        match err {
            // Store outages are transient from the pipeline's point of view
            AppError::Database(msg) => ProviderError::retryable(format!("Database error: {}", msg)),
            other => ProviderError::Fatal(other.to_string()),
        }
    }
}
