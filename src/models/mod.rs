// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod enrichment;
pub mod pending_input;
pub mod pipeline;
pub mod token;

pub use activity::{
    Activity, ActivityType, MuscleGroup, Position, Record, Session, StrengthSet,
};
pub use enrichment::{
    EnrichmentResult, ExecutionStatus, PendingInputRequest, PipelineOutcome, PipelineStatus,
    ProviderExecution, Streams, TimedSample,
};
pub use pending_input::{PendingInput, PendingInputStatus};
pub use pipeline::{PipelineConfig, ProviderConfig, UserContext};
pub use token::{OAuthProvider, UserTokens};
