// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - enrichment engines and pipeline plumbing.

pub mod canonicalizer;
pub mod fusion;
pub mod lag_policy;
pub mod merge;
pub mod muscle_load;
pub mod orchestrator;
pub mod tasks;
pub mod token_manager;

pub use canonicalizer::{CatalogError, ExerciseCatalog, ExerciseMatch};
pub use fusion::{align_time_series, AlignmentConfig, AlignmentResult, AlignmentStatus};
pub use lag_policy::{LagDecision, LagPolicy};
pub use merge::ActivityAccumulator;
pub use muscle_load::{CoefficientTable, MuscleLoadEngine, MuscleRating, MuscleScores};
pub use orchestrator::PipelineOrchestrator;
pub use tasks::{EnrichActivityPayload, RecordingQueue, RetryQueue, TasksService};
pub use token_manager::{OAuthClientConfig, TokenError, TokenHandle, TokenManager};
