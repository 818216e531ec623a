// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Startup-time provider registration.

use crate::db::PendingInputStore;
use crate::providers::{
    ActivityFilterProvider, BrandingProvider, ConditionMatcherProvider, FitbitHeartRateProvider,
    MockProvider, MuscleHeatmapProvider, ParkrunProvider, Provider, TypeMapperProvider,
    UserInputProvider, WorkoutSummaryProvider,
};
use crate::services::{ExerciseCatalog, TokenManager};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared collaborators the built-in providers need.
#[derive(Clone)]
pub struct ProviderDeps {
    pub pending_inputs: Arc<dyn PendingInputStore>,
    pub tokens: Arc<TokenManager>,
    pub catalog: Arc<ExerciseCatalog>,
    /// Fitbit Web API base URL (overridable for tests)
    pub fitbit_api_base: String,
}

/// Mapping from provider identifier to implementation.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in provider.
    pub fn with_defaults(deps: ProviderDeps) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FitbitHeartRateProvider::new(
            deps.tokens,
            deps.fitbit_api_base,
        )));
        registry.register(Arc::new(MuscleHeatmapProvider::new(deps.catalog)));
        registry.register(Arc::new(UserInputProvider::new(deps.pending_inputs)));
        registry.register(Arc::new(ActivityFilterProvider));
        registry.register(Arc::new(TypeMapperProvider));
        registry.register(Arc::new(ConditionMatcherProvider));
        match ParkrunProvider::builtin() {
            Ok(parkrun) => registry.register(Arc::new(parkrun)),
            Err(e) => tracing::error!(error = %e, "Parkrun provider unavailable"),
        }
        registry.register(Arc::new(WorkoutSummaryProvider));
        registry.register(Arc::new(BrandingProvider));
        registry.register(Arc::new(MockProvider));

        tracing::info!(providers = ?registry.names(), "Registered enrichment providers");
        registry
    }

    /// Register a provider under its own name, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
