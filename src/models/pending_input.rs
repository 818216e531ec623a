// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pending human input for paused pipelines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingInputStatus {
    Waiting,
    Completed,
}

/// Pending input record stored in Firestore, keyed by `{source}:{external_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInput {
    /// `{source}:{external_id}` (also used as document ID)
    pub activity_key: String,
    pub user_id: String,
    pub status: PendingInputStatus,
    pub required_fields: Vec<String>,
    /// Operator-supplied values; only read by the pipeline
    #[serde(default)]
    pub input_data: HashMap<String, String>,
    /// When the pipeline first paused (ISO 8601)
    pub created_at: String,
    /// When an operator completed the input (ISO 8601)
    pub completed_at: Option<String>,
}

impl PendingInput {
    pub fn is_completed(&self) -> bool {
        self.status == PendingInputStatus::Completed
    }
}
