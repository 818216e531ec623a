// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Retry policy for upstream data that syncs late.
//!
//! Wearables often upload minutes after a workout ends. A provider fetching
//! their data needs to tell "not here yet" apart from "never coming".

use crate::models::TimedSample;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// What a provider should do with the samples it fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagDecision {
    /// Samples cover the whole activity window
    Complete,
    /// Coverage is incomplete but the caller forced acceptance
    AcceptPartial,
    /// Data is probably still syncing; retry after the delay
    Retry(Duration),
    /// Activity is too old for missing data to arrive; proceed with none
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagPolicy {
    /// Slack allowed at each end of the activity window
    pub tolerance: Duration,
    /// Activities that ended within this window are worth retrying
    pub freshness_window: Duration,
    pub retry_delay: Duration,
}

impl Default for LagPolicy {
    fn default() -> Self {
        Self {
            tolerance: Duration::from_secs(120),
            freshness_window: Duration::from_secs(30 * 60),
            retry_delay: Duration::from_secs(60),
        }
    }
}

impl LagPolicy {
    /// True if the samples span `[start, end]` within tolerance.
    pub fn covers(&self, samples: &[TimedSample], start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let Some(first) = samples.iter().map(|s| s.timestamp).min() else {
            return false;
        };
        let Some(last) = samples.iter().map(|s| s.timestamp).max() else {
            return false;
        };

        let tolerance = chrono::Duration::from_std(self.tolerance).unwrap_or_default();
        first <= start + tolerance && last >= end - tolerance
    }

    pub fn evaluate(
        &self,
        samples: &[TimedSample],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        force_accept: bool,
        now: DateTime<Utc>,
    ) -> LagDecision {
        if self.covers(samples, start, end) {
            return LagDecision::Complete;
        }

        if force_accept {
            return LagDecision::AcceptPartial;
        }

        let since_end = (now - end).to_std().unwrap_or_default();
        if since_end <= self.freshness_window {
            LagDecision::Retry(self.retry_delay)
        } else {
            LagDecision::GiveUp
        }
    }
}
