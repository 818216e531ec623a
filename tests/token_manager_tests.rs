// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token refresh against a mock OAuth endpoint.

mod common;

use chrono::{Duration, Utc};
use common::test_token_manager;
use fitglue_enricher::db::{InMemoryDb, TokenStore};
use fitglue_enricher::models::{OAuthProvider, UserTokens};
use fitglue_enricher::services::TokenError;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Base64 of `fitbit_test_id:fitbit_test_secret`
const FITBIT_BASIC: &str = "Basic Zml0Yml0X3Rlc3RfaWQ6Zml0Yml0X3Rlc3Rfc2VjcmV0";

async fn seed(db: &InMemoryDb, provider: OAuthProvider, expires_in_secs: i64) {
    db.set_tokens(
        "user-1",
        provider,
        &UserTokens {
            access_token: "old-access".to_string(),
            refresh_token: "old-refresh".to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
            scopes: vec!["heartrate".to_string()],
        },
    )
    .await
    .unwrap();
}

fn refreshed() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "new-access",
        "refresh_token": "new-refresh",
        "expires_in": 28800,
        "token_type": "Bearer"
    }))
}

#[tokio::test]
async fn test_fresh_token_skips_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(refreshed())
        .expect(0)
        .mount(&server)
        .await;

    let db = InMemoryDb::new();
    seed(&db, OAuthProvider::Fitbit, 3600).await;
    let manager = test_token_manager(&db, &server.uri());

    let token = manager.get_token("user-1", OAuthProvider::Fitbit).await.unwrap();
    assert_eq!(token, "old-access");
}

#[tokio::test]
async fn test_expiring_token_refreshed_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(header("authorization", FITBIT_BASIC))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .respond_with(refreshed())
        .expect(1)
        .mount(&server)
        .await;

    let db = InMemoryDb::new();
    // Inside the proactive window
    seed(&db, OAuthProvider::Fitbit, 30).await;
    let manager = test_token_manager(&db, &server.uri());

    let token = manager.get_token("user-1", OAuthProvider::Fitbit).await.unwrap();
    assert_eq!(token, "new-access");

    let stored = db
        .get_tokens("user-1", OAuthProvider::Fitbit)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.refresh_token, "new-refresh");
    assert_eq!(stored.scopes, vec!["heartrate"], "scopes kept when omitted");
    assert!(stored.expires_at > Utc::now() + Duration::hours(7));
}

#[tokio::test]
async fn test_strava_sends_credentials_in_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("client_id=strava_test_id"))
        .and(body_string_contains("client_secret=strava_test_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "strava-access",
            "expires_at": (Utc::now() + Duration::hours(6)).timestamp(),
            "expires_in": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let db = InMemoryDb::new();
    seed(&db, OAuthProvider::Strava, -10).await;
    let manager = test_token_manager(&db, &server.uri());

    let token = manager.get_token("user-1", OAuthProvider::Strava).await.unwrap();
    assert_eq!(token, "strava-access");

    let stored = db
        .get_tokens("user-1", OAuthProvider::Strava)
        .await
        .unwrap()
        .unwrap();
    // No refresh token in the response: keep the old one
    assert_eq!(stored.refresh_token, "old-refresh");
    // expires_at wins over expires_in
    assert!(stored.expires_at > Utc::now() + Duration::hours(5));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(refreshed().set_delay(std::time::Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let db = InMemoryDb::new();
    seed(&db, OAuthProvider::Fitbit, 0).await;
    let manager = test_token_manager(&db, &server.uri());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let handle = manager.handle("user-1", OAuthProvider::Fitbit);
            tokio::spawn(async move { handle.get_token().await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), "new-access");
    }

    // One seed write plus exactly one refresh write
    assert_eq!(db.token_write_count(), 2);
}

#[tokio::test]
async fn test_force_refresh_ignores_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(refreshed())
        .expect(1)
        .mount(&server)
        .await;

    let db = InMemoryDb::new();
    seed(&db, OAuthProvider::Fitbit, 3600).await;
    let manager = test_token_manager(&db, &server.uri());

    let handle = manager.handle("user-1", OAuthProvider::Fitbit);
    assert_eq!(handle.force_refresh().await.unwrap(), "new-access");
}

#[tokio::test]
async fn test_invalid_grant_requires_relink() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"errorType": "invalid_grant", "message": "Refresh token invalid"}]
        })))
        .mount(&server)
        .await;

    let db = InMemoryDb::new();
    seed(&db, OAuthProvider::Fitbit, 0).await;
    let manager = test_token_manager(&db, &server.uri());

    let err = manager
        .get_token("user-1", OAuthProvider::Fitbit)
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Refresh(_)), "got {:?}", err);
    assert_eq!(db.token_write_count(), 1, "nothing written on failure");
}

#[tokio::test]
async fn test_upstream_outage_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let db = InMemoryDb::new();
    seed(&db, OAuthProvider::Fitbit, 0).await;
    let manager = test_token_manager(&db, &server.uri());

    let err = manager
        .get_token("user-1", OAuthProvider::Fitbit)
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Transient(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unlinked_user() {
    let db = InMemoryDb::new();
    let manager = test_token_manager(&db, "http://127.0.0.1:9");

    let err = manager
        .get_token("nobody", OAuthProvider::Fitbit)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TokenError::NotLinked {
            user_id: "nobody".to_string(),
            provider: OAuthProvider::Fitbit,
        }
    );
}
