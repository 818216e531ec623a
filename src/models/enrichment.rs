// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider results, execution records and pipeline outcomes.

use crate::models::activity::{Activity, ActivityType, Position};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Delta a provider contributes to the activity.
///
/// Absence of a field means "no change"; there are no delete semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// Name override (first non-empty wins unless `override_name`)
    pub name: Option<String>,
    /// Replace any earlier name override
    #[serde(default)]
    pub override_name: bool,
    /// Appended to the final name after all providers run
    pub name_suffix: Option<String>,
    pub activity_type: Option<ActivityType>,
    /// Description fragment, never the whole description
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub streams: Streams,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Pending-input key whose data this result consumed
    pub consumed_input: Option<String>,
}

impl EnrichmentResult {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, fragment: impl Into<String>) -> Self {
        self.description = Some(fragment.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Raw sample streams, one value per elapsed second from activity start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Streams {
    #[serde(default)]
    pub heart_rate: Vec<u32>,
    #[serde(default)]
    pub power: Vec<u32>,
    #[serde(default)]
    pub position: Vec<Position>,
}

impl Streams {
    pub fn is_empty(&self) -> bool {
        self.heart_rate.is_empty() && self.power.is_empty() && self.position.is_empty()
    }
}

/// A single timestamped value exchanged with the fusion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedSample {
    pub timestamp: DateTime<Utc>,
    pub value: i64,
}

/// Terminal state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub enum PipelineStatus {
    Success,
    Skipped,
    Waiting,
    /// Transient failure; the caller should re-run the whole pipeline later.
    Retry,
    Failed,
}

/// Status of one provider invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub enum ExecutionStatus {
    Success,
    Skipped,
    Waiting,
    Retry,
    Failed,
}

/// Observability record for one provider invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct ProviderExecution {
    pub provider_name: String,
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub metadata: HashMap<String, String>,
}

/// Fields an operator must supply before a waiting run can resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct PendingInputRequest {
    pub key: String,
    pub required_fields: Vec<String>,
}

/// Everything the caller learns from one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub pipeline_id: String,
    pub status: PipelineStatus,
    /// Final activity, present only on success
    pub activity: Option<Activity>,
    pub destinations: Vec<String>,
    pub applied_enrichments: Vec<String>,
    pub executions: Vec<ProviderExecution>,
    /// Human-readable reason for non-success states
    pub reason: Option<String>,
    #[serde(with = "duration_secs_opt", default)]
    pub retry_after: Option<Duration>,
    pub pending_input: Option<PendingInputRequest>,
}

impl PipelineOutcome {
    /// True when the result may be forwarded to destinations.
    pub fn is_publishable(&self) -> bool {
        self.status == PipelineStatus::Success && self.activity.is_some()
    }
}

mod duration_secs_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
