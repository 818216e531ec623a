// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitGlue enricher: runs user-configured enrichment pipelines over
//! fitness activities.
//!
//! This crate provides the pipeline engine (providers, result merging,
//! retry classification) and the Cloud Tasks endpoint that drives it.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::PendingInputStore;
use services::{PipelineOrchestrator, RetryQueue};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub pending_inputs: Arc<dyn PendingInputStore>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub retry_queue: Arc<dyn RetryQueue>,
}
