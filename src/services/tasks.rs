// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Tasks service for delayed pipeline retries.
//!
//! A run that ends in a retryable state is re-queued as a new task on the
//! enrichment queue with a schedule time in the future. The whole pipeline
//! runs again from scratch when the task fires.
//!
//! Uses the official google-cloud-tasks-v2 SDK.

use crate::error::AppError;
use crate::error::Result;
use crate::models::{Activity, PipelineConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use validator::Validate;

/// Endpoint that enrichment tasks call.
pub const ENRICH_TASK_PATH: &str = "/tasks/enrich";

/// Payload sent to the enrichment task.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EnrichActivityPayload {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    pub activity: Activity,
    #[validate(nested)]
    pub pipeline: PipelineConfig,
    /// When the activity first entered the pipeline; drives `force_accept`
    pub first_seen_at: DateTime<Utc>,
    /// 1 for the first run, incremented on every delayed retry
    #[serde(default = "first_attempt")]
    #[validate(range(min = 1))]
    pub attempt: u32,
}

fn first_attempt() -> u32 {
    1
}

/// Queue for delayed re-runs of a pipeline.
#[async_trait]
pub trait RetryQueue: Send + Sync {
    async fn queue_enrichment_retry(
        &self,
        service_url: &str,
        payload: &EnrichActivityPayload,
        delay: Duration,
    ) -> Result<()>;
}

/// Cloud Tasks client wrapper.
pub struct TasksService {
    project_id: String,
    location: String,
    queue_name: String,
}

impl TasksService {
    pub fn new(project_id: &str, region: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            location: region.to_string(),
            queue_name: crate::config::ENRICHMENT_QUEUE_NAME.to_string(),
        }
    }

    fn queue_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.location, self.queue_name
        )
    }

    /// Generic task queuing helper.
    async fn queue_task<T: Serialize>(
        &self,
        service_url: &str,
        endpoint: &str,
        payload: &T,
        schedule_at: DateTime<Utc>,
    ) -> Result<()> {
        use google_cloud_tasks_v2::client::CloudTasks;
        use google_cloud_tasks_v2::model::{HttpRequest, OidcToken, Task};

        let client = CloudTasks::builder()
            .build()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cloud Tasks client error: {}", e)))?;

        let body = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON error: {}", e)))?;

        let http_request = HttpRequest::default()
            .set_url(format!("{}{}", service_url, endpoint))
            .set_http_method("POST")
            .set_body(axum::body::Bytes::from(body))
            .set_headers(std::collections::HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]))
            .set_oidc_token(
                OidcToken::default()
                    .set_service_account_email(format!(
                        "fitglue-enricher@{}.iam.gserviceaccount.com",
                        self.project_id
                    ))
                    .set_audience(service_url.to_string()),
            );

        let task = Task::default()
            .set_http_request(http_request)
            .set_schedule_time(google_cloud_wkt::Timestamp::clamp(
                schedule_at.timestamp(),
                0,
            ));

        let _response = client
            .create_task()
            .set_parent(self.queue_path())
            .set_task(task)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cloud Tasks create error: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl RetryQueue for TasksService {
    async fn queue_enrichment_retry(
        &self,
        service_url: &str,
        payload: &EnrichActivityPayload,
        delay: Duration,
    ) -> Result<()> {
        let schedule_at = retry_schedule_time(Utc::now(), delay);

        tracing::info!(
            user_id = %payload.user_id,
            activity = %payload.activity.stable_key(),
            attempt = payload.attempt,
            schedule_at = %schedule_at,
            "Queuing delayed enrichment retry"
        );

        self.queue_task(service_url, ENRICH_TASK_PATH, payload, schedule_at)
            .await
    }
}

/// When a retry delayed by `delay` should fire.
pub fn retry_schedule_time(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(60))
}

/// In-process queue that records retries instead of sending them.
///
/// Used for local development and tests.
#[derive(Default)]
pub struct RecordingQueue {
    queued: Mutex<Vec<(EnrichActivityPayload, Duration)>>,
    fail: bool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue whose every enqueue fails.
    pub fn failing() -> Self {
        Self {
            queued: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Retries queued so far.
    pub fn queued(&self) -> Vec<(EnrichActivityPayload, Duration)> {
        self.queued
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RetryQueue for RecordingQueue {
    async fn queue_enrichment_retry(
        &self,
        _service_url: &str,
        payload: &EnrichActivityPayload,
        delay: Duration,
    ) -> Result<()> {
        if self.fail {
            return Err(AppError::Internal(anyhow::anyhow!("Queue unavailable")));
        }

        tracing::debug!(
            activity = %payload.activity.stable_key(),
            delay_secs = delay.as_secs(),
            "Recorded enrichment retry"
        );

        self.queued
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Queue lock poisoned")))?
            .push((payload.clone(), delay));
        Ok(())
    }
}
