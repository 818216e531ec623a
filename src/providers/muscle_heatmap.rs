// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Muscle heatmap provider: renders per-muscle training load as text.

use crate::error::ProviderError;
use crate::models::{Activity, EnrichmentResult, MuscleGroup, StrengthSet, UserContext};
use crate::providers::{input, Provider, ProviderInputs};
use crate::services::muscle_load::{CoefficientTable, MuscleLoadEngine, MuscleRating};
use crate::services::ExerciseCatalog;
use async_trait::async_trait;
use std::sync::Arc;

const HEADER: &str = "Muscle Heatmap:\n";
const FILLED: &str = "🟪";
const EMPTY: &str = "⬜";

const MIN_BAR_LENGTH: u32 = 3;
const MAX_BAR_LENGTH: u32 = 10;
const DEFAULT_BAR_LENGTH: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    EmojiBars,
    Percentage,
    Text,
}

impl Style {
    fn from_input(value: Option<&str>) -> Self {
        match value {
            Some("percentage") => Style::Percentage,
            Some("text") => Style::Text,
            _ => Style::EmojiBars,
        }
    }
}

fn bar_length(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.parse::<u32>().ok())
        .map_or(DEFAULT_BAR_LENGTH, |len| len.clamp(MIN_BAR_LENGTH, MAX_BAR_LENGTH))
}

pub struct MuscleHeatmapProvider {
    catalog: Arc<ExerciseCatalog>,
}

impl MuscleHeatmapProvider {
    pub fn new(catalog: Arc<ExerciseCatalog>) -> Self {
        Self { catalog }
    }

    /// Fill in muscle groups the source platform did not classify.
    fn classify(&self, sets: impl Iterator<Item = StrengthSet>) -> (Vec<StrengthSet>, usize) {
        let mut canonicalized = 0;
        let sets = sets
            .map(|mut set| {
                if set.primary_muscle_group == MuscleGroup::Unspecified {
                    let found = self.catalog.lookup(&set.exercise_name);
                    if found.matched {
                        tracing::debug!(
                            exercise = %set.exercise_name,
                            canonical = %found.canonical_name,
                            confidence = found.confidence,
                            "Canonicalized exercise"
                        );
                        set.primary_muscle_group = found.primary;
                        set.secondary_muscle_groups = found.secondary;
                        canonicalized += 1;
                    }
                }
                set
            })
            .collect();
        (sets, canonicalized)
    }
}

/// One `- Muscle: value` line, newline-terminated.
fn render_row(rating: &MuscleRating, max_score: f64, bar_length: u32, style: Style) -> String {
    let name = rating.muscle.display_name();
    match style {
        Style::Percentage => {
            let pct = if max_score > 0.0 {
                (rating.score / max_score * 100.0) as u32
            } else {
                0
            };
            format!("- {}: {}%\n", name, pct)
        }
        Style::Text => {
            let level = if rating.rating >= bar_length * 3 / 4 {
                "Very High"
            } else if rating.rating >= bar_length / 2 {
                "High"
            } else if rating.rating >= bar_length / 4 {
                "Medium"
            } else {
                "Low"
            };
            format!("- {}: {}\n", name, level)
        }
        Style::EmojiBars => {
            let filled = rating.rating.min(bar_length) as usize;
            let bar = FILLED.repeat(filled) + &EMPTY.repeat(bar_length as usize - filled);
            format!("- {}: {}\n", name, bar)
        }
    }
}

#[async_trait]
impl Provider for MuscleHeatmapProvider {
    fn name(&self) -> &'static str {
        "muscle-heatmap"
    }

    async fn enrich(
        &self,
        activity: &Activity,
        _user: &UserContext,
        inputs: &ProviderInputs,
        _force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        let (sets, canonicalized) = self.classify(activity.strength_sets().cloned());
        if sets.is_empty() {
            return Ok(EnrichmentResult::default());
        }

        let style = Style::from_input(input(inputs, "style"));
        let bar_length = bar_length(input(inputs, "bar_length"));
        let coefficients = CoefficientTable::preset(input(inputs, "preset").unwrap_or("standard"));

        let scores = MuscleLoadEngine::new(coefficients).score(&sets);
        let max_score = scores.max_score();

        let mut ratings = scores.ratings(bar_length);
        ratings.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.muscle.display_name().cmp(b.muscle.display_name()))
        });

        let mut fragment = String::from(HEADER);
        for rating in &ratings {
            fragment.push_str(&render_row(rating, max_score, bar_length, style));
        }

        Ok(EnrichmentResult::default()
            .with_description(fragment)
            .with_metadata("muscle_groups_displayed", ratings.len().to_string())
            .with_metadata("max_score", format!("{:.2}", max_score))
            .with_metadata("exercises_canonicalized", canonicalized.to_string()))
    }
}
