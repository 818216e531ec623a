// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Tasks origin check for `/tasks/*` routes.
//!
//! Cloud Run strips `X-CloudTasks-*` headers from external requests, so a
//! matching queue name means the request was dispatched by our queue.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

pub const QUEUE_NAME_HEADER: &str = "x-cloudtasks-queuename";

/// Reject task requests that did not come from the enrichment queue.
pub async fn require_tasks_queue(request: Request, next: Next) -> Result<Response, StatusCode> {
    let queue_name_header = request.headers().get(QUEUE_NAME_HEADER);
    let is_valid_queue = queue_name_header
        .and_then(|h| h.to_str().ok())
        .map(|name| name == crate::config::ENRICHMENT_QUEUE_NAME)
        .unwrap_or(false);

    if !is_valid_queue {
        tracing::warn!(
            header = ?queue_name_header,
            path = %request.uri().path(),
            "Blocked tasks request with invalid queue header"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
