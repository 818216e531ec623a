// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit heart rate provider against a mock Fitbit API.

mod common;

use chrono::{DateTime, Duration, Utc};
use common::{start_time, strength_activity, test_token_manager};
use fitglue_enricher::db::{InMemoryDb, TokenStore};
use fitglue_enricher::error::ProviderError;
use fitglue_enricher::models::{Activity, OAuthProvider, UserContext, UserTokens};
use fitglue_enricher::providers::{FitbitHeartRateProvider, Provider, ProviderInputs};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTRADAY_PATH: &str = r"^/1/user/-/activities/heart/date/.+/1d/1sec/time/.+\.json$";

fn user() -> UserContext {
    UserContext {
        user_id: "user-1".to_string(),
    }
}

/// Strength activity lasting `secs` seconds starting at `start`.
fn activity_at(start: DateTime<Utc>, secs: u32) -> Activity {
    let mut activity = strength_activity(vec![]);
    activity.start_time = start;
    activity.sessions[0].start_time = Some(start);
    activity.sessions[0].total_elapsed_secs = secs;
    activity
}

/// Intraday body with one point per second for `[from, to)` seconds after `start`.
fn intraday(start: DateTime<Utc>, from: i64, to: i64) -> Value {
    let dataset: Vec<Value> = (from..to)
        .map(|s| {
            json!({
                "time": (start + Duration::seconds(s)).format("%H:%M:%S").to_string(),
                "value": 100 + (s % 20),
            })
        })
        .collect();

    json!({
        "activities-heart": [],
        "activities-heart-intraday": {
            "dataset": dataset,
            "datasetInterval": 1,
            "datasetType": "second"
        }
    })
}

async fn linked_db() -> InMemoryDb {
    let db = InMemoryDb::new();
    db.set_tokens(
        "user-1",
        OAuthProvider::Fitbit,
        &UserTokens {
            access_token: "old-access".to_string(),
            refresh_token: "old-refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(2),
            scopes: vec!["heartrate".to_string()],
        },
    )
    .await
    .unwrap();
    db
}

fn provider(db: &InMemoryDb, server: &MockServer) -> FitbitHeartRateProvider {
    FitbitHeartRateProvider::new(test_token_manager(db, &server.uri()), server.uri())
}

#[tokio::test]
async fn test_full_coverage_builds_per_second_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/heart/date/2026-03-14/1d/1sec/time/07:00/07:05.json"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intraday(start_time(), 0, 300)))
        .expect(1)
        .mount(&server)
        .await;

    let db = linked_db().await;
    let result = provider(&db, &server)
        .enrich(&activity_at(start_time(), 300), &user(), &ProviderInputs::new(), false)
        .await
        .unwrap();

    let hr = &result.streams.heart_rate;
    assert_eq!(hr.len(), 300);
    assert_eq!(hr[0], 100);
    assert_eq!(hr[5], 105);
    assert_eq!(hr[299], 119);

    assert_eq!(result.metadata["hr_source"], "fitbit");
    assert_eq!(result.metadata["hr_points"], "300");
    assert_eq!(result.metadata["status_detail"], "Success");
    assert_eq!(result.metadata["alignment_status"], "success");
    assert_eq!(result.metadata["query_start"], "07:00");
    assert_eq!(result.metadata["query_end"], "07:05");
    assert!(!result.metadata.contains_key("alignment_warning"));
}

#[tokio::test]
async fn test_unauthorized_refreshes_once_and_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(INTRADAY_PATH))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expires_in": 28800
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(INTRADAY_PATH))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intraday(start_time(), 0, 60)))
        .expect(1)
        .mount(&server)
        .await;

    let db = linked_db().await;
    let result = provider(&db, &server)
        .enrich(&activity_at(start_time(), 60), &user(), &ProviderInputs::new(), false)
        .await
        .unwrap();

    assert_eq!(result.streams.heart_rate.len(), 60);
    let stored = db
        .get_tokens("user-1", OAuthProvider::Fitbit)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.access_token, "new-access");
}

#[tokio::test]
async fn test_recent_activity_with_gap_retries() {
    let server = MockServer::start().await;
    let start = Utc::now() - Duration::minutes(10);
    Mock::given(method("GET"))
        .and(path_regex(INTRADAY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(intraday(start, 0, 60)))
        .mount(&server)
        .await;

    let db = linked_db().await;
    let err = provider(&db, &server)
        .enrich(&activity_at(start, 300), &user(), &ProviderInputs::new(), false)
        .await
        .unwrap_err();

    match err {
        ProviderError::Retryable { delay, reason } => {
            assert_eq!(delay, std::time::Duration::from_secs(60));
            assert!(reason.contains("60 points"), "reason: {}", reason);
        }
        other => panic!("expected retryable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_force_accept_uses_partial_data() {
    let server = MockServer::start().await;
    let start = Utc::now() - Duration::minutes(10);
    Mock::given(method("GET"))
        .and(path_regex(INTRADAY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(intraday(start, 0, 60)))
        .mount(&server)
        .await;

    let db = linked_db().await;
    let result = provider(&db, &server)
        .enrich(&activity_at(start, 300), &user(), &ProviderInputs::new(), true)
        .await
        .unwrap();

    assert_eq!(result.metadata["status_detail"], "Partial heart rate data accepted");
    assert_eq!(result.metadata["alignment_status"], "high_drift_best_effort");
    assert!(result.metadata.contains_key("alignment_warning"));
    // 60 s of heart rate stretched across the whole 300 s timeline
    assert_eq!(result.streams.heart_rate.len(), 300);
    assert!(result.streams.heart_rate.iter().all(|&bpm| bpm >= 100));
}

#[tokio::test]
async fn test_old_activity_without_data_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(INTRADAY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities-heart": [],
            "activities-heart-intraday": {"dataset": []}
        })))
        .mount(&server)
        .await;

    let db = linked_db().await;
    let result = provider(&db, &server)
        .enrich(&activity_at(start_time(), 300), &user(), &ProviderInputs::new(), false)
        .await
        .unwrap();

    assert!(result.streams.heart_rate.is_empty());
    assert_eq!(result.metadata["hr_points"], "0");
    assert_eq!(
        result.metadata["status_detail"],
        "No heart rate data points found in Fitbit response"
    );
}

#[tokio::test]
async fn test_activity_past_midnight_uses_data_up_to_midnight() {
    use chrono::TimeZone;

    // 23:30 to 00:30; the day's data ends at 23:59:59
    let start = Utc.with_ymd_and_hms(2025, 3, 14, 23, 30, 0).unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/heart/date/2025-03-14/1d/1sec/time/23:30/23:59.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intraday(start, 0, 1800)))
        .expect(1)
        .mount(&server)
        .await;

    let db = linked_db().await;
    let result = provider(&db, &server)
        .enrich(&activity_at(start, 3600), &user(), &ProviderInputs::new(), false)
        .await
        .unwrap();

    assert_eq!(result.metadata["hr_points"], "1800");
    assert_eq!(result.metadata["status_detail"], "Success");
    assert_eq!(result.metadata["query_end"], "23:59");
    assert_eq!(result.metadata["query_clipped_at_midnight"], "true");

    let hr = &result.streams.heart_rate;
    assert_eq!(hr.len(), 1800);
    assert_eq!(hr[0], 100);
    assert_eq!(hr[1799], 119);
}

#[tokio::test]
async fn test_rate_limit_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(INTRADAY_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let db = linked_db().await;
    let err = provider(&db, &server)
        .enrich(&activity_at(start_time(), 300), &user(), &ProviderInputs::new(), false)
        .await
        .unwrap_err();

    assert!(err.is_retryable(), "got {:?}", err);
}

#[tokio::test]
async fn test_forbidden_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(INTRADAY_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficient_scope"))
        .mount(&server)
        .await;

    let db = linked_db().await;
    let err = provider(&db, &server)
        .enrich(&activity_at(start_time(), 300), &user(), &ProviderInputs::new(), false)
        .await
        .unwrap_err();

    match err {
        ProviderError::Fatal(msg) => assert!(msg.contains("insufficient_scope")),
        other => panic!("expected fatal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unlinked_user_is_fatal() {
    let server = MockServer::start().await;
    let db = InMemoryDb::new();

    let err = provider(&db, &server)
        .enrich(&activity_at(start_time(), 300), &user(), &ProviderInputs::new(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Fatal(_)), "got {:?}", err);
}
