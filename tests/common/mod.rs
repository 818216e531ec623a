// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, TimeZone, Utc};
use fitglue_enricher::config::Config;
use fitglue_enricher::db::{FirestoreDb, InMemoryDb};
use fitglue_enricher::models::{
    Activity, ActivityType, MuscleGroup, PipelineConfig, ProviderConfig, Session, StrengthSet,
};
use fitglue_enricher::providers::{ProviderDeps, ProviderRegistry};
use fitglue_enricher::routes::create_router;
use fitglue_enricher::services::{
    ExerciseCatalog, OAuthClientConfig, PipelineOrchestrator, RecordingQueue, TokenManager,
};
use fitglue_enricher::AppState;
use std::collections::HashMap;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Handles a test needs to inspect after driving the app.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: InMemoryDb,
    pub queue: Arc<RecordingQueue>,
}

/// Token manager over `db` with both clients pointed at `token_base`.
#[allow(dead_code)]
pub fn test_token_manager(db: &InMemoryDb, token_base: &str) -> Arc<TokenManager> {
    Arc::new(TokenManager::new(
        Arc::new(db.clone()),
        vec![
            OAuthClientConfig::fitbit("fitbit_test_id", "fitbit_test_secret")
                .with_token_url(format!("{}/oauth2/token", token_base)),
            OAuthClientConfig::strava("strava_test_id", "strava_test_secret")
                .with_token_url(format!("{}/oauth/token", token_base)),
        ],
    ))
}

/// Orchestrator with every built-in provider over in-memory stores.
#[allow(dead_code)]
pub fn test_orchestrator(db: &InMemoryDb, api_base: &str) -> PipelineOrchestrator {
    let registry = ProviderRegistry::with_defaults(ProviderDeps {
        pending_inputs: Arc::new(db.clone()),
        tokens: test_token_manager(db, api_base),
        catalog: Arc::new(ExerciseCatalog::builtin().expect("catalog")),
        fitbit_api_base: api_base.to_string(),
    });
    PipelineOrchestrator::new(Arc::new(registry), Arc::new(db.clone()))
}

/// Create a test app over in-memory stores and a recording retry queue.
#[allow(dead_code)]
pub fn create_test_app_with_queue(queue: RecordingQueue) -> TestApp {
    let db = InMemoryDb::new();
    let queue = Arc::new(queue);

    let state = Arc::new(AppState {
        config: Config::test_default(),
        pending_inputs: Arc::new(db.clone()),
        orchestrator: Arc::new(test_orchestrator(&db, "http://127.0.0.1:9")),
        retry_queue: queue.clone(),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        queue,
    }
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_queue(RecordingQueue::new())
}

#[allow(dead_code)]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 7, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn strength_set(name: &str, reps: u32, weight: f64, primary: MuscleGroup) -> StrengthSet {
    StrengthSet {
        exercise_name: name.to_string(),
        reps,
        weight_kg: weight,
        primary_muscle_group: primary,
        ..Default::default()
    }
}

/// Strength activity with one session.
#[allow(dead_code)]
pub fn strength_activity(sets: Vec<StrengthSet>) -> Activity {
    Activity {
        source: "hevy".to_string(),
        external_id: "workout-1".to_string(),
        name: "Morning Workout".to_string(),
        description: String::new(),
        activity_type: ActivityType::WeightTraining,
        tags: vec![],
        start_time: start_time(),
        sessions: vec![Session {
            start_time: Some(start_time()),
            total_elapsed_secs: 3600,
            strength_sets: sets,
            records: vec![],
        }],
        enrichment_metadata: HashMap::new(),
    }
}

#[allow(dead_code)]
pub fn pipeline(steps: Vec<ProviderConfig>) -> PipelineConfig {
    PipelineConfig {
        id: "pipeline-1".to_string(),
        source: "hevy".to_string(),
        enrichers: steps,
        destinations: vec!["strava".to_string()],
    }
}
