// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Time-series fusion ("elastic match").
//!
//! Aligns a secondary sensor stream (e.g. heart rate from a watch) onto a
//! primary timeline (e.g. GPS samples from another device). The two devices
//! keep their own clocks, so instead of matching timestamps directly the
//! source span is stretched or compressed onto the target span and values
//! are linearly interpolated.

use crate::models::TimedSample;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Alignment parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentConfig {
    /// Drift above this percentage produces a warning
    pub max_drift_percent: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_drift_percent: 1.0,
        }
    }
}

/// How the alignment went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentStatus {
    Success,
    HighDriftBestEffort,
    /// No target timeline; nothing to align onto
    SkippedNoTarget,
    /// No source samples; output is zero-filled
    SkippedNoSource,
}

impl AlignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentStatus::Success => "success",
            AlignmentStatus::HighDriftBestEffort => "high_drift_best_effort",
            AlignmentStatus::SkippedNoTarget => "skipped_no_gps",
            AlignmentStatus::SkippedNoSource => "skipped_no_hr",
        }
    }
}

/// Aligned values plus drift diagnostics.
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    /// One value per target timestamp, in ascending target order
    pub values: Vec<i64>,
    pub drift_percent: f64,
    pub status: AlignmentStatus,
    pub warning: Option<String>,
    /// Diagnostics suitable for enrichment metadata
    pub metadata: HashMap<String, String>,
}

impl AlignmentResult {
    fn skipped(len: usize, status: AlignmentStatus, warning: Option<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("alignment_status".to_string(), status.as_str().to_string());
        Self {
            values: vec![0; len],
            drift_percent: 0.0,
            status,
            warning,
            metadata,
        }
    }
}

/// Align `source` samples onto the `targets` timeline.
pub fn align_time_series(
    targets: &[DateTime<Utc>],
    source: &[TimedSample],
    config: &AlignmentConfig,
) -> AlignmentResult {
    if targets.is_empty() {
        tracing::info!("Alignment skipped: no target timestamps");
        return AlignmentResult::skipped(0, AlignmentStatus::SkippedNoTarget, None);
    }

    if source.is_empty() {
        tracing::warn!(targets = targets.len(), "Alignment skipped: no source samples");
        return AlignmentResult::skipped(
            targets.len(),
            AlignmentStatus::SkippedNoSource,
            Some("No HR data available for alignment".to_string()),
        );
    }

    let mut sorted_targets = targets.to_vec();
    sorted_targets.sort();

    let mut sorted_source = source.to_vec();
    sorted_source.sort_by_key(|s| s.timestamp);

    let target_start = sorted_targets[0];
    let target_duration = millis_between(target_start, sorted_targets[sorted_targets.len() - 1]);

    let source_start = sorted_source[0].timestamp;
    let source_duration =
        millis_between(source_start, sorted_source[sorted_source.len() - 1].timestamp);

    let drift_percent = if target_duration > 0.0 {
        (target_duration - source_duration).abs() / target_duration * 100.0
    } else {
        0.0
    };

    let (status, warning) = if drift_percent > config.max_drift_percent {
        tracing::warn!(
            drift_percent,
            threshold_percent = config.max_drift_percent,
            target_duration_sec = target_duration / 1000.0,
            source_duration_sec = source_duration / 1000.0,
            "High clock drift detected during alignment"
        );
        (
            AlignmentStatus::HighDriftBestEffort,
            Some(format!(
                "Clock drift of {:.2}% detected (threshold: {:.2}%), applying best-effort alignment",
                drift_percent, config.max_drift_percent
            )),
        )
    } else {
        (AlignmentStatus::Success, None)
    };

    // > 1 stretches a shorter source, < 1 compresses a longer one
    let scale_factor = if source_duration > 0.0 {
        target_duration / source_duration
    } else {
        1.0
    };

    // Source samples as (offset from source start in ms, value)
    let points: Vec<(f64, i64)> = sorted_source
        .iter()
        .map(|s| (millis_between(source_start, s.timestamp), s.value))
        .collect();

    let values: Vec<i64> = sorted_targets
        .iter()
        .map(|&t| {
            let relative = if target_duration > 0.0 {
                millis_between(target_start, t) / target_duration
            } else {
                0.0
            };
            interpolate(&points, source_duration * relative)
        })
        .collect();

    let mut metadata = HashMap::new();
    metadata.insert("alignment_status".to_string(), status.as_str().to_string());
    metadata.insert(
        "gps_duration_sec".to_string(),
        format!("{:.1}", target_duration / 1000.0),
    );
    metadata.insert(
        "hr_duration_sec".to_string(),
        format!("{:.1}", source_duration / 1000.0),
    );
    metadata.insert("drift_percent".to_string(), format!("{:.2}", drift_percent));
    metadata.insert("gps_samples".to_string(), sorted_targets.len().to_string());
    metadata.insert("hr_samples".to_string(), sorted_source.len().to_string());
    metadata.insert("scale_factor".to_string(), format!("{:.4}", scale_factor));

    tracing::info!(
        drift_percent,
        scale_factor,
        samples_aligned = values.len(),
        "Alignment completed"
    );

    AlignmentResult {
        values,
        drift_percent,
        status,
        warning,
        metadata,
    }
}

fn millis_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64
}

/// Value at `offset` ms, clamped to the first/last sample outside the
/// source span and linearly interpolated inside it.
fn interpolate(points: &[(f64, i64)], offset: f64) -> i64 {
    let (first_offset, first_value) = points[0];
    let (last_offset, last_value) = points[points.len() - 1];

    if offset <= first_offset {
        return first_value;
    }
    if offset >= last_offset {
        return last_value;
    }

    // Last sample at or before the offset; always >= 1 here
    let before = points.partition_point(|(t, _)| *t <= offset) - 1;
    let (t0, v0) = points[before];
    let (t1, v1) = points[before + 1];

    if t1 == t0 {
        return v0;
    }

    let ratio = (offset - t0) / (t1 - t0);
    (v0 as f64 + ratio * (v1 - v0) as f64).round() as i64
}
