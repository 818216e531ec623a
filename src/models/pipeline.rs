// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-authored pipeline configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Ordered list of providers plus source and destinations.
///
/// Immutable for the duration of a run. Order is significant: it determines
/// name precedence and description concatenation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    #[validate(length(min = 1))]
    pub id: String,
    /// Source this pipeline applies to (e.g. "hevy")
    #[validate(length(min = 1))]
    pub source: String,
    #[serde(default)]
    pub enrichers: Vec<ProviderConfig>,
    #[serde(default)]
    pub destinations: Vec<String>,
}

/// One configured step: provider identifier and its input parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default)]
    pub inputs: HashMap<String, String>,
}

impl ProviderConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: HashMap::new(),
        }
    }

    pub fn with_input(mut self, key: &str, value: &str) -> Self {
        self.inputs.insert(key.to_string(), value.to_string());
        self
    }
}

/// Who the pipeline runs for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
}
