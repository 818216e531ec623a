// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Enrichment providers.
//!
//! A provider is one configurable step of a pipeline. It reads the activity
//! as merged so far and returns a delta ([`EnrichmentResult`]) or one of the
//! non-normal outcomes in [`ProviderError`].

pub mod activity_filter;
pub mod branding;
pub mod condition_matcher;
pub mod fitbit_hr;
mod location;
pub mod mock;
pub mod muscle_heatmap;
pub mod parkrun;
pub mod registry;
pub mod type_mapper;
pub mod user_input;
pub mod workout_summary;

pub use activity_filter::ActivityFilterProvider;
pub use branding::BrandingProvider;
pub use condition_matcher::ConditionMatcherProvider;
pub use fitbit_hr::FitbitHeartRateProvider;
pub use mock::MockProvider;
pub use muscle_heatmap::MuscleHeatmapProvider;
pub use parkrun::ParkrunProvider;
pub use registry::{ProviderDeps, ProviderRegistry};
pub use type_mapper::TypeMapperProvider;
pub use user_input::UserInputProvider;
pub use workout_summary::WorkoutSummaryProvider;

use crate::error::ProviderError;
use crate::models::{Activity, EnrichmentResult, UserContext};
use async_trait::async_trait;
use std::collections::HashMap;

/// Input parameters configured for one pipeline step.
pub type ProviderInputs = HashMap<String, String>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Identifier used in pipeline configuration.
    fn name(&self) -> &'static str;

    /// Branding providers always run last, wherever they are configured.
    fn is_branding(&self) -> bool {
        false
    }

    /// Compute this provider's delta for the activity.
    ///
    /// `force_accept` is set once the caller's retry budget is spent; a
    /// provider must then use whatever partial data exists instead of
    /// returning [`ProviderError::Retryable`].
    async fn enrich(
        &self,
        activity: &Activity,
        user: &UserContext,
        inputs: &ProviderInputs,
        force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError>;
}

/// Trimmed, non-empty input value.
pub(crate) fn input<'a>(inputs: &'a ProviderInputs, key: &str) -> Option<&'a str> {
    inputs
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Comma-separated list input, trimmed, empties dropped.
pub(crate) fn list_input(inputs: &ProviderInputs, key: &str) -> Vec<String> {
    input(inputs, key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Boolean input; accepts "true"/"1"/"yes" case-insensitively.
pub(crate) fn bool_input(inputs: &ProviderInputs, key: &str, default: bool) -> bool {
    match input(inputs, key) {
        Some(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}
