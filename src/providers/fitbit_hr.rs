// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit intraday heart rate provider.
//!
//! Fetches 1-second heart rate for the activity window, waits for late
//! syncs according to the [`LagPolicy`], then stretches the samples onto
//! the activity timeline.

use crate::error::ProviderError;
use crate::models::{Activity, EnrichmentResult, OAuthProvider, Streams, TimedSample, UserContext};
use crate::providers::{Provider, ProviderInputs};
use crate::services::fusion::{align_time_series, AlignmentConfig};
use crate::services::lag_policy::{LagDecision, LagPolicy};
use crate::services::{TokenHandle, TokenManager};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;

/// Production Fitbit Web API.
pub const FITBIT_API_BASE: &str = "https://api.fitbit.com";

/// Window length used when the activity carries no elapsed time.
const DEFAULT_WINDOW_SECS: u32 = 3600;

const SECS_PER_DAY: u32 = 86_400;

const STATUS_SUCCESS: &str = "Success";
const STATUS_NO_POINTS: &str = "No heart rate data points found in Fitbit response";
const STATUS_PARTIAL: &str = "Partial heart rate data accepted";
const STATUS_GAVE_UP: &str = "Heart rate data never synced";

#[derive(Debug, Deserialize)]
struct IntradayResponse {
    #[serde(rename = "activities-heart-intraday", default)]
    intraday: IntradayDataset,
}

#[derive(Debug, Default, Deserialize)]
struct IntradayDataset {
    #[serde(default)]
    dataset: Vec<IntradayPoint>,
}

#[derive(Debug, Deserialize)]
struct IntradayPoint {
    time: String,
    value: i64,
}

/// Query window for one activity.
///
/// Intraday queries cannot cross midnight, so an activity running past the
/// end of its start date is only fetched, checked and aligned up to 23:59:59.
#[derive(Debug, Clone, PartialEq)]
struct QueryWindow {
    start: DateTime<Utc>,
    /// End of the activity itself
    end: DateTime<Utc>,
    /// Last instant the query can return data for
    query_end: DateTime<Utc>,
    /// Seconds from `start` that the query covers
    span_secs: u32,
}

impl QueryWindow {
    fn for_activity(activity: &Activity) -> Self {
        let duration_secs = match activity.elapsed_secs() {
            0 => DEFAULT_WINDOW_SECS,
            secs => secs,
        };
        let start = activity.start_time;
        let end = start + Duration::seconds(i64::from(duration_secs));

        let secs_left_in_day = SECS_PER_DAY - start.num_seconds_from_midnight();
        let (query_end, span_secs) = if duration_secs >= secs_left_in_day {
            (
                start + Duration::seconds(i64::from(secs_left_in_day) - 1),
                secs_left_in_day,
            )
        } else {
            (end, duration_secs)
        };

        Self {
            start,
            end,
            query_end,
            span_secs,
        }
    }

    fn is_clipped(&self) -> bool {
        self.query_end < self.end
    }

    fn date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    fn start_hhmm(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    fn end_hhmm(&self) -> String {
        self.query_end.format("%H:%M").to_string()
    }
}

pub struct FitbitHeartRateProvider {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    lag_policy: LagPolicy,
    alignment: AlignmentConfig,
}

impl FitbitHeartRateProvider {
    pub fn new(tokens: Arc<TokenManager>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            lag_policy: LagPolicy::default(),
            alignment: AlignmentConfig::default(),
        }
    }

    pub fn with_lag_policy(mut self, lag_policy: LagPolicy) -> Self {
        self.lag_policy = lag_policy;
        self
    }

    fn intraday_url(&self, window: &QueryWindow) -> String {
        format!(
            "{}/1/user/-/activities/heart/date/{}/1d/1sec/time/{}/{}.json",
            self.base_url,
            window.date(),
            window.start_hhmm(),
            window.end_hhmm()
        )
    }

    /// Fetch the intraday dataset, refreshing the token once on 401.
    async fn fetch(&self, handle: &TokenHandle, url: &str) -> Result<IntradayResponse, ProviderError> {
        let token = handle.get_token().await?;
        let mut response = self.send(url, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(user_id = handle.user_id(), "Fitbit rejected access token, refreshing");
            let token = handle.force_refresh().await?;
            response = self.send(url, &token).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                tracing::warn!(status = %status, "Fitbit API temporarily unavailable");
                return Err(ProviderError::retryable(format!("Fitbit API HTTP {}", status)));
            }

            return Err(ProviderError::Fatal(format!(
                "Fitbit API HTTP {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Fatal(format!("Fitbit JSON parse error: {}", e)))
    }

    async fn send(&self, url: &str, token: &str) -> Result<reqwest::Response, ProviderError> {
        self.http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::retryable(format!("Fitbit request failed: {}", e)))
    }
}

/// Convert intraday points to samples on the window's date.
fn to_samples(window: &QueryWindow, points: &[IntradayPoint]) -> Vec<TimedSample> {
    let date = window.start.date_naive();
    points
        .iter()
        .filter_map(|point| match NaiveTime::parse_from_str(&point.time, "%H:%M:%S") {
            Ok(time) => Some(TimedSample {
                timestamp: date.and_time(time).and_utc(),
                value: point.value,
            }),
            Err(_) => {
                tracing::debug!(time = %point.time, "Skipping unparseable Fitbit sample");
                None
            }
        })
        .collect()
}

/// Timestamps to align onto: existing records, else one per second.
fn alignment_targets(activity: &Activity, window: &QueryWindow) -> Vec<DateTime<Utc>> {
    let records = activity.record_timestamps();
    if !records.is_empty() {
        return records;
    }

    (0..window.span_secs)
        .map(|s| window.start + Duration::seconds(i64::from(s)))
        .collect()
}

/// Place aligned values into a per-second stream.
fn to_stream(start: DateTime<Utc>, targets: &[DateTime<Utc>], values: &[i64]) -> Vec<u32> {
    let mut sorted = targets.to_vec();
    sorted.sort();

    let offsets: Vec<Option<usize>> = sorted
        .iter()
        .map(|t| usize::try_from((*t - start).num_seconds()).ok())
        .collect();

    let len = offsets.iter().flatten().max().map_or(0, |max| max + 1);
    let mut stream = vec![0; len];
    for (offset, value) in offsets.into_iter().zip(values) {
        if let Some(offset) = offset {
            stream[offset] = u32::try_from(*value).unwrap_or(0);
        }
    }
    stream
}

#[async_trait]
impl Provider for FitbitHeartRateProvider {
    fn name(&self) -> &'static str {
        "fitbit-heart-rate"
    }

    async fn enrich(
        &self,
        activity: &Activity,
        user: &UserContext,
        _inputs: &ProviderInputs,
        force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        let window = QueryWindow::for_activity(activity);
        let handle = self.tokens.handle(&user.user_id, OAuthProvider::Fitbit);

        let response = self.fetch(&handle, &self.intraday_url(&window)).await?;
        let samples = to_samples(&window, &response.intraday.dataset);

        let mut result = EnrichmentResult::default()
            .with_metadata("hr_source", "fitbit")
            .with_metadata("hr_points", samples.len().to_string())
            .with_metadata("query_start", window.start_hhmm())
            .with_metadata("query_end", window.end_hhmm());

        if window.is_clipped() {
            result = result.with_metadata("query_clipped_at_midnight", "true");
        }

        let decision = self.lag_policy.evaluate(
            &samples,
            window.start,
            window.query_end,
            force_accept,
            Utc::now(),
        );

        let status_detail = match decision {
            LagDecision::Retry(delay) => {
                tracing::info!(
                    user_id = %user.user_id,
                    points = samples.len(),
                    "Fitbit heart rate incomplete, waiting for sync"
                );
                return Err(ProviderError::Retryable {
                    delay,
                    reason: format!(
                        "Fitbit heart rate incomplete ({} points), data may still be syncing",
                        samples.len()
                    ),
                });
            }
            LagDecision::GiveUp => {
                tracing::warn!(user_id = %user.user_id, "Fitbit heart rate never synced, continuing without it");
                return Ok(result.with_metadata(
                    "status_detail",
                    if samples.is_empty() {
                        STATUS_NO_POINTS
                    } else {
                        STATUS_GAVE_UP
                    },
                ));
            }
            _ if samples.is_empty() => STATUS_NO_POINTS,
            LagDecision::AcceptPartial => STATUS_PARTIAL,
            LagDecision::Complete => STATUS_SUCCESS,
        };

        let targets = alignment_targets(activity, &window);
        let aligned = align_time_series(&targets, &samples, &self.alignment);

        result = result.with_metadata("status_detail", status_detail);
        result.metadata.extend(aligned.metadata);
        if let Some(warning) = aligned.warning {
            result = result.with_metadata("alignment_warning", warning);
        }

        result.streams = Streams {
            heart_rate: to_stream(window.start, &targets, &aligned.values),
            ..Default::default()
        };

        tracing::info!(
            user_id = %user.user_id,
            points = samples.len(),
            stream_len = result.streams.heart_rate.len(),
            "Retrieved Fitbit heart rate"
        );

        Ok(result)
    }
}
