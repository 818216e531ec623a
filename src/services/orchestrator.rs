// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pipeline orchestration.
//!
//! Runs the configured providers for one activity strictly in order,
//! merges their results into a single accumulator and classifies the run:
//!
//! - every provider returned normally: `SUCCESS`
//! - a provider halted: `SKIPPED` (later providers never run)
//! - a provider needs human input: `WAITING` (a pending input is recorded)
//! - a provider hit a transient failure: `RETRY` with a suggested delay
//! - a provider failed fatally: `FAILED`
//!
//! Only `SUCCESS` carries an activity; every other outcome discards the
//! merges accumulated so far.

use crate::db::PendingInputStore;
use crate::error::ProviderError;
use crate::models::{
    Activity, ExecutionStatus, PendingInput, PendingInputRequest, PendingInputStatus,
    PipelineConfig, PipelineOutcome, PipelineStatus, ProviderConfig, ProviderExecution,
    UserContext,
};
use crate::providers::{Provider, ProviderRegistry};
use crate::services::merge::ActivityAccumulator;
use crate::time_utils::now_rfc3339;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A configured step resolved against the registry.
struct PlannedStep<'a> {
    config: &'a ProviderConfig,
    provider: Option<Arc<dyn Provider>>,
}

impl PlannedStep<'_> {
    fn is_branding(&self) -> bool {
        self.provider.as_ref().is_some_and(|p| p.is_branding())
    }
}

/// How a run stopped before completing.
enum Stop {
    Halted(String),
    Waiting(PendingInputRequest),
    Retry(Duration, String),
    Failed(String),
}

pub struct PipelineOrchestrator {
    registry: Arc<ProviderRegistry>,
    pending_inputs: Arc<dyn PendingInputStore>,
}

impl PipelineOrchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, pending_inputs: Arc<dyn PendingInputStore>) -> Self {
        Self {
            registry,
            pending_inputs,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run `pipeline` over `activity`.
    pub async fn execute(
        &self,
        activity: Activity,
        user: &UserContext,
        pipeline: &PipelineConfig,
        force_accept: bool,
    ) -> PipelineOutcome {
        let activity_key = activity.stable_key();
        tracing::info!(
            pipeline_id = %pipeline.id,
            user_id = %user.user_id,
            activity = %activity_key,
            providers = pipeline.enrichers.len(),
            force_accept,
            "Starting enrichment pipeline"
        );

        let steps = self.plan(pipeline);
        let mut accumulator = ActivityAccumulator::new(activity);
        let mut executions = Vec::with_capacity(steps.len());
        let mut applied = Vec::new();
        let mut consumed_inputs = Vec::new();
        let mut stop = None;

        for step in &steps {
            let execution_id = uuid::Uuid::new_v4().to_string();

            let Some(provider) = &step.provider else {
                tracing::warn!(provider = %step.config.name, "Provider not registered, skipping");
                executions.push(ProviderExecution {
                    provider_name: step.config.name.clone(),
                    execution_id,
                    status: ExecutionStatus::Skipped,
                    error: Some("provider not registered".to_string()),
                    duration_ms: 0,
                    metadata: HashMap::new(),
                });
                continue;
            };

            let started = Instant::now();
            let result = provider
                .enrich(
                    accumulator.activity(),
                    user,
                    &step.config.inputs,
                    force_accept,
                )
                .await;
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let (status, error, metadata) = match result {
                Ok(result) => {
                    let metadata = result.metadata.clone();
                    if let Some(key) = &result.consumed_input {
                        consumed_inputs.push(key.clone());
                    }
                    accumulator.apply(result, provider.is_branding());
                    applied.push(provider.name().to_string());
                    (ExecutionStatus::Success, None, metadata)
                }
                Err(err) => {
                    let message = err.to_string();
                    let (status, metadata, reason) = self.classify(err, user, &activity_key).await;
                    stop = Some(reason);
                    (status, Some(message), metadata)
                }
            };

            tracing::info!(
                provider = provider.name(),
                execution_id = %execution_id,
                duration_ms,
                status = ?status,
                "Provider executed"
            );

            executions.push(ProviderExecution {
                provider_name: provider.name().to_string(),
                execution_id,
                status,
                error,
                duration_ms,
                metadata,
            });

            if stop.is_some() {
                break;
            }
        }

        let mut outcome = PipelineOutcome {
            pipeline_id: pipeline.id.clone(),
            status: PipelineStatus::Success,
            activity: None,
            destinations: pipeline.destinations.clone(),
            applied_enrichments: applied,
            executions,
            reason: None,
            retry_after: None,
            pending_input: None,
        };

        match stop {
            None => {
                outcome.activity = Some(accumulator.finish());
                self.release_consumed_inputs(&consumed_inputs).await;
            }
            Some(Stop::Halted(reason)) => {
                outcome.status = PipelineStatus::Skipped;
                outcome.reason = Some(reason);
            }
            Some(Stop::Waiting(request)) => {
                outcome.status = PipelineStatus::Waiting;
                outcome.reason = Some(format!("Waiting for input: {}", request.required_fields.join(", ")));
                outcome.pending_input = Some(request);
            }
            Some(Stop::Retry(delay, reason)) => {
                outcome.status = PipelineStatus::Retry;
                outcome.retry_after = Some(delay);
                outcome.reason = Some(reason);
            }
            Some(Stop::Failed(reason)) => {
                outcome.status = PipelineStatus::Failed;
                outcome.reason = Some(reason);
            }
        }

        tracing::info!(
            pipeline_id = %pipeline.id,
            activity = %activity_key,
            status = ?outcome.status,
            reason = outcome.reason.as_deref().unwrap_or(""),
            "Enrichment pipeline finished"
        );

        outcome
    }

    /// Resolve configured steps, moving branding providers to the end.
    fn plan<'a>(&self, pipeline: &'a PipelineConfig) -> Vec<PlannedStep<'a>> {
        let (mut steps, branding): (Vec<_>, Vec<_>) = pipeline
            .enrichers
            .iter()
            .map(|config| PlannedStep {
                config,
                provider: self.registry.get(&config.name),
            })
            .partition(|step| !step.is_branding());

        steps.extend(branding);
        steps
    }

    /// Map a provider error to its execution status and stop reason.
    async fn classify(
        &self,
        err: ProviderError,
        user: &UserContext,
        activity_key: &str,
    ) -> (ExecutionStatus, HashMap<String, String>, Stop) {
        match err {
            ProviderError::Halt { reason, metadata } => {
                (ExecutionStatus::Skipped, metadata, Stop::Halted(reason))
            }
            ProviderError::WaitForInput {
                key,
                required_fields,
            } => match self.ensure_pending_input(&key, user, activity_key, &required_fields).await {
                Ok(()) => (
                    ExecutionStatus::Waiting,
                    HashMap::new(),
                    Stop::Waiting(PendingInputRequest {
                        key,
                        required_fields,
                    }),
                ),
                Err(err) => Self::classify_terminal(err),
            },
            other => Self::classify_terminal(other),
        }
    }

    fn classify_terminal(err: ProviderError) -> (ExecutionStatus, HashMap<String, String>, Stop) {
        match err {
            ProviderError::Retryable { delay, reason } => (
                ExecutionStatus::Retry,
                HashMap::new(),
                Stop::Retry(delay, reason),
            ),
            other => (
                ExecutionStatus::Failed,
                HashMap::new(),
                Stop::Failed(other.to_string()),
            ),
        }
    }

    /// Create the pending input unless it already exists.
    async fn ensure_pending_input(
        &self,
        key: &str,
        user: &UserContext,
        activity_key: &str,
        required_fields: &[String],
    ) -> Result<(), ProviderError> {
        if self.pending_inputs.get_pending_input(key).await?.is_some() {
            tracing::debug!(key, "Pending input already exists");
            return Ok(());
        }

        let input = PendingInput {
            activity_key: key.to_string(),
            user_id: user.user_id.clone(),
            status: PendingInputStatus::Waiting,
            required_fields: required_fields.to_vec(),
            input_data: HashMap::new(),
            created_at: now_rfc3339(),
            completed_at: None,
        };

        let created = self.pending_inputs.create_pending_input(&input).await?;
        tracing::info!(key, activity = activity_key, created, "Pipeline waiting for input");
        Ok(())
    }

    /// Delete pending inputs consumed by a successful run.
    async fn release_consumed_inputs(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.pending_inputs.delete_pending_input(key).await {
                // The run already succeeded; a leftover record is only re-read
                tracing::warn!(key = %key, error = %e, "Failed to delete consumed pending input");
            }
        }
    }
}
