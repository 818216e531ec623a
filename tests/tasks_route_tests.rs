// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Enrichment task handler over HTTP.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{pipeline, strength_activity, strength_set};
use fitglue_enricher::models::{MuscleGroup, ProviderConfig};
use fitglue_enricher::services::{EnrichActivityPayload, RecordingQueue};
use serde_json::Value;
use tower::ServiceExt;

mod common;

const QUEUE_HEADER: &str = "x-cloudtasks-queuename";

fn payload(steps: Vec<ProviderConfig>) -> EnrichActivityPayload {
    EnrichActivityPayload {
        user_id: "user-1".to_string(),
        activity: strength_activity(vec![strength_set(
            "Bench Press",
            10,
            100.0,
            MuscleGroup::Chest,
        )]),
        pipeline: pipeline(steps),
        first_seen_at: Utc::now(),
        attempt: 1,
    }
}

fn enrich_request(payload: &EnrichActivityPayload, queue: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/tasks/enrich")
        .header("content-type", "application/json");
    if let Some(queue) = queue {
        builder = builder.header(QUEUE_HEADER, queue);
    }
    builder
        .body(Body::from(serde_json::to_string(payload).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_enrich_without_queue_header_forbidden() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(enrich_request(&payload(vec![ProviderConfig::new("mock")]), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_enrich_from_wrong_queue_forbidden() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(enrich_request(
            &payload(vec![ProviderConfig::new("mock")]),
            Some("activity-processing"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_enrich_success() {
    let app = common::create_test_app();
    let steps = vec![
        ProviderConfig::new("mock").with_input("name", "Push Day"),
        ProviderConfig::new("branding"),
    ];

    let response = app
        .router
        .oneshot(enrich_request(&payload(steps), Some("enrichment-pipeline")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(body["activity"]["name"], "Push Day");
    assert_eq!(body["destinations"][0], "strava");
    assert_eq!(body["executions"].as_array().unwrap().len(), 2);
    assert!(app.queue.queued().is_empty());
}

#[tokio::test]
async fn test_enrich_waiting_is_terminal() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(enrich_request(
            &payload(vec![ProviderConfig::new("user_input")]),
            Some("enrichment-pipeline"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "WAITING");
    assert_eq!(body["pending_input"]["key"], "hevy:workout-1");
    assert_eq!(app.db.pending_input_count(), 1);
    assert!(app.queue.queued().is_empty());
}

#[tokio::test]
async fn test_enrich_retry_is_requeued() {
    let app = common::create_test_app();
    let steps = vec![ProviderConfig::new("mock").with_input("behavior", "lag")];

    let response = app
        .router
        .oneshot(enrich_request(&payload(steps), Some("enrichment-pipeline")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "RETRY");
    assert_eq!(body["retry_after"], 60);
    assert!(body["activity"].is_null());

    let queued = app.queue.queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].0.attempt, 2);
    assert_eq!(queued[0].0.pipeline.id, "pipeline-1");
    assert_eq!(queued[0].1, std::time::Duration::from_secs(60));
}

#[tokio::test]
async fn test_retry_attempt_counter_saturates() {
    let app = common::create_test_app();
    let mut last = payload(vec![ProviderConfig::new("mock").with_input("behavior", "lag")]);
    last.attempt = u32::MAX;

    let response = app
        .router
        .oneshot(enrich_request(&last, Some("enrichment-pipeline")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(app.queue.queued()[0].0.attempt, u32::MAX);
}

#[tokio::test]
async fn test_enrich_past_lag_budget_forces_accept() {
    let app = common::create_test_app();
    let mut late = payload(vec![ProviderConfig::new("mock").with_input("behavior", "lag")]);
    late.first_seen_at = Utc::now() - Duration::minutes(20);
    late.attempt = 12;

    let response = app
        .router
        .oneshot(enrich_request(&late, Some("enrichment-pipeline")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(body["activity"]["name"], "Mock Activity (Lag Exhausted)");
    assert!(app.queue.queued().is_empty());
}

#[tokio::test]
async fn test_enrich_queue_failure_returns_500() {
    let app = common::create_test_app_with_queue(RecordingQueue::failing());
    let steps = vec![ProviderConfig::new("mock").with_input("behavior", "lag")];

    let response = app
        .router
        .oneshot(enrich_request(&payload(steps), Some("enrichment-pipeline")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "internal_error");
}

#[tokio::test]
async fn test_enrich_rejects_invalid_payload() {
    let app = common::create_test_app();
    let mut bad = payload(vec![ProviderConfig::new("mock")]);
    bad.attempt = 0;

    let response = app
        .router
        .oneshot(enrich_request(&bad, Some("enrichment-pipeline")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_enrich_fatal_is_acknowledged() {
    let app = common::create_test_app();
    let steps = vec![ProviderConfig::new("mock").with_input("behavior", "fail")];

    let response = app
        .router
        .oneshot(enrich_request(&payload(steps), Some("enrichment-pipeline")))
        .await
        .unwrap();

    // Terminal failures must not trigger Cloud Tasks redelivery
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "FAILED");
    assert!(body["reason"].as_str().unwrap().starts_with("Fatal:"));
}
