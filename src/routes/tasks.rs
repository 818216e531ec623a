// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task handler routes for Cloud Tasks callbacks.
//!
//! These endpoints are called by Cloud Tasks, not directly by users; the
//! router guards them with the queue-header middleware.

use crate::config::LAG_BUDGET_SECS;
use crate::error::{AppError, DEFAULT_RETRY_DELAY};
use crate::models::{PipelineOutcome, PipelineStatus, UserContext};
use crate::services::tasks::{EnrichActivityPayload, ENRICH_TASK_PATH};
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use validator::Validate;

/// Task handler routes (called by Cloud Tasks).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(ENRICH_TASK_PATH, post(enrich_activity))
}

/// Providers must accept partial data once the lag budget is spent.
pub fn should_force_accept(first_seen_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - first_seen_at > Duration::seconds(LAG_BUDGET_SECS)
}

/// Run one pipeline (called by Cloud Tasks).
///
/// Terminal outcomes return 200 so Cloud Tasks does not retry them. A
/// retryable outcome is re-queued with a delay and acknowledged with 202;
/// if re-queuing fails we return 500 and let Cloud Tasks retry instead.
async fn enrich_activity(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EnrichActivityPayload>,
) -> Result<(StatusCode, Json<PipelineOutcome>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let force_accept = should_force_accept(payload.first_seen_at, Utc::now());

    tracing::info!(
        user_id = %payload.user_id,
        activity = %payload.activity.stable_key(),
        pipeline_id = %payload.pipeline.id,
        attempt = payload.attempt,
        force_accept,
        "Processing enrichment task"
    );

    let user = UserContext {
        user_id: payload.user_id.clone(),
    };
    let outcome = state
        .orchestrator
        .execute(
            payload.activity.clone(),
            &user,
            &payload.pipeline,
            force_accept,
        )
        .await;

    if outcome.status != PipelineStatus::Retry {
        return Ok((StatusCode::OK, Json(outcome)));
    }

    let delay = outcome.retry_after.unwrap_or(DEFAULT_RETRY_DELAY);
    let retry = EnrichActivityPayload {
        attempt: payload.attempt.saturating_add(1),
        ..payload
    };

    state
        .retry_queue
        .queue_enrichment_retry(&state.config.service_url, &retry, delay)
        .await
        .inspect_err(|e| {
            tracing::error!(
                activity = %retry.activity.stable_key(),
                error = %e,
                "Failed to queue enrichment retry"
            );
        })?;

    Ok((StatusCode::ACCEPTED, Json(outcome)))
}
