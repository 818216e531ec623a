// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Operator endpoints for pending inputs.
//!
//! Completing an input does not resume the pipeline by itself; the next
//! run of the activity's pipeline picks the data up.

use crate::error::{AppError, Result};
use crate::models::{PendingInput, PendingInputStatus};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/inputs/{key}", get(get_input))
        .route("/inputs/{key}/complete", post(complete_input))
}

#[derive(Debug, Deserialize)]
pub struct CompleteInputRequest {
    pub input_data: HashMap<String, String>,
}

async fn load(state: &AppState, key: &str) -> Result<PendingInput> {
    state
        .pending_inputs
        .get_pending_input(key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pending input {}", key)))
}

/// Get a pending input by activity key.
async fn get_input(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<PendingInput>> {
    Ok(Json(load(&state, &key).await?))
}

/// Mark a pending input as completed with operator-supplied data.
async fn complete_input(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(request): Json<CompleteInputRequest>,
) -> Result<Json<PendingInput>> {
    let mut input = load(&state, &key).await?;

    let missing: Vec<&str> = input
        .required_fields
        .iter()
        .filter(|field| {
            request
                .input_data
                .get(field.as_str())
                .map_or(true, |v| v.trim().is_empty())
        })
        .map(String::as_str)
        .collect();

    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    input.status = PendingInputStatus::Completed;
    input.input_data = request.input_data;
    input.completed_at = Some(now_rfc3339());

    state.pending_inputs.update_pending_input(&input).await?;

    tracing::info!(key = %key, user_id = %input.user_id, "Pending input completed");
    Ok(Json(input))
}
