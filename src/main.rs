// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitGlue Enricher Server
//!
//! Receives enrichment tasks from Cloud Tasks, runs the configured
//! provider pipeline over each activity and re-queues runs that hit
//! upstream data lag.

use fitglue_enricher::{
    config::Config,
    db::{FirestoreDb, InMemoryDb, PendingInputStore, TokenStore},
    providers::{fitbit_hr::FITBIT_API_BASE, ProviderDeps, ProviderRegistry},
    services::{
        ExerciseCatalog, PipelineOrchestrator, RecordingQueue, RetryQueue, TasksService,
        TokenManager,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting FitGlue enricher");

    // Stores: Firestore in production, in-memory for local development
    let (pending_inputs, token_store, retry_queue): (
        Arc<dyn PendingInputStore>,
        Arc<dyn TokenStore>,
        Arc<dyn RetryQueue>,
    ) = if config.use_in_memory_db {
        tracing::warn!("Using in-memory stores; retries are recorded, not queued");
        let db = InMemoryDb::new();
        (
            Arc::new(db.clone()),
            Arc::new(db),
            Arc::new(RecordingQueue::new()),
        )
    } else {
        let db = FirestoreDb::new(&config.gcp_project_id)
            .await
            .expect("Failed to connect to Firestore");

        let tasks_service = TasksService::new(&config.gcp_project_id, &config.gcp_region);
        tracing::info!(
            project = %config.gcp_project_id,
            "Cloud Tasks service initialized"
        );

        (Arc::new(db.clone()), Arc::new(db), Arc::new(tasks_service))
    };

    // Load exercise catalog
    let catalog = ExerciseCatalog::builtin().expect("Failed to load exercise catalog");
    tracing::info!(count = catalog.len(), "Exercise catalog loaded");

    // Token manager is shared so refreshes serialize across requests
    let tokens = Arc::new(TokenManager::from_config(&config, token_store));

    let registry = ProviderRegistry::with_defaults(ProviderDeps {
        pending_inputs: pending_inputs.clone(),
        tokens,
        catalog: Arc::new(catalog),
        fitbit_api_base: FITBIT_API_BASE.to_string(),
    });

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(registry),
        pending_inputs.clone(),
    ));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        pending_inputs,
        orchestrator,
        retry_queue,
    });

    // Build router
    let app = fitglue_enricher::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fitglue_enricher=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
