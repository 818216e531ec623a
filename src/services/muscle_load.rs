// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Muscle load scoring.
//!
//! Turns strength sets into a weighted volume score per muscle group and a
//! discrete bar rating relative to the hardest-worked muscle.

use crate::models::{MuscleGroup, StrengthSet};
use std::collections::{BTreeMap, HashMap};

/// Bar rating scale used when none is given.
pub const DEFAULT_RATING_SCALE: u32 = 5;

/// Heuristic load per rep for bodyweight sets.
const BODYWEIGHT_LOAD_PER_REP: f64 = 40.0;

/// Secondary muscles receive half of the weighted load.
const SECONDARY_FACTOR: f64 = 0.5;

/// Muscle-size normalizing weights.
///
/// Small muscles cannot move the weight large ones can, so their volume is
/// scaled up. Unlisted groups use 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    coefficients: HashMap<MuscleGroup, f64>,
}

impl CoefficientTable {
    /// Balanced weighting (legs = 1.0 baseline).
    pub fn standard() -> Self {
        use MuscleGroup::*;
        Self::from_pairs(&[
            (Quadriceps, 1.0),
            (Hamstrings, 1.0),
            (Glutes, 1.0),
            (Calves, 1.0),
            (Adductors, 1.0),
            (Abductors, 1.0),
            (Lats, 1.2),
            (UpperBack, 1.2),
            (LowerBack, 1.2),
            (Neck, 1.2),
            (Traps, 1.2),
            (Chest, 1.5),
            (Shoulders, 2.5),
            (Biceps, 4.0),
            (Triceps, 4.0),
            (Forearms, 4.0),
            (Abdominals, 3.0),
            (Cardio, 0.5),
            (FullBody, 1.0),
        ])
    }

    /// Emphasizes the big compound lifts.
    pub fn powerlifting() -> Self {
        use MuscleGroup::*;
        Self::from_pairs(&[
            (Quadriceps, 1.0),
            (Hamstrings, 1.0),
            (Glutes, 1.0),
            (LowerBack, 1.0),
            (Chest, 1.0),
            (Lats, 1.2),
            (UpperBack, 1.2),
            (Traps, 1.2),
            (Shoulders, 2.0),
            (Triceps, 3.0),
            (Biceps, 3.5),
            (Forearms, 3.5),
            (Calves, 2.0),
            (Abdominals, 2.5),
        ])
    }

    /// Emphasizes isolation work.
    pub fn bodybuilding() -> Self {
        use MuscleGroup::*;
        Self::from_pairs(&[
            (Quadriceps, 1.0),
            (Hamstrings, 1.0),
            (Glutes, 1.0),
            (Calves, 0.8),
            (Chest, 1.2),
            (Lats, 1.2),
            (UpperBack, 1.2),
            (LowerBack, 1.5),
            (Shoulders, 2.0),
            (Traps, 2.0),
            (Biceps, 3.5),
            (Triceps, 3.5),
            (Forearms, 4.0),
            (Abdominals, 2.5),
        ])
    }

    /// Look up a preset by name. Unknown names fall back to standard.
    pub fn preset(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "powerlifting" => Self::powerlifting(),
            "bodybuilding" => Self::bodybuilding(),
            _ => Self::standard(),
        }
    }

    fn from_pairs(pairs: &[(MuscleGroup, f64)]) -> Self {
        Self {
            coefficients: pairs.iter().copied().collect(),
        }
    }

    pub fn get(&self, muscle: MuscleGroup) -> f64 {
        self.coefficients.get(&muscle).copied().unwrap_or(1.0)
    }
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Raw load of a single set before muscle weighting.
///
/// Distance-based sets use 10 m = 1 unit, duration-only sets 2 s = 1 unit,
/// and bodyweight sets a fixed load per rep.
pub fn set_load(set: &StrengthSet) -> f64 {
    if set.distance_meters > 0.0 {
        return set.distance_meters * 0.1;
    }

    if set.duration_secs > 0 && set.reps == 0 && set.weight_kg == 0.0 {
        return f64::from(set.duration_secs) * 0.5;
    }

    if set.weight_kg <= 0.0 {
        return f64::from(set.reps) * BODYWEIGHT_LOAD_PER_REP;
    }

    set.weight_kg * f64::from(set.reps)
}

/// Display-ready rating for one muscle.
#[derive(Debug, Clone, PartialEq)]
pub struct MuscleRating {
    pub muscle: MuscleGroup,
    pub score: f64,
    pub rating: u32,
}

/// Accumulated weighted scores for an activity.
#[derive(Debug, Clone, Default)]
pub struct MuscleScores {
    scores: BTreeMap<MuscleGroup, f64>,
}

impl MuscleScores {
    pub fn max_score(&self) -> f64 {
        self.scores.values().copied().fold(0.0, f64::max)
    }

    pub fn score(&self, muscle: MuscleGroup) -> f64 {
        self.scores.get(&muscle).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Ratings on `[0, scale]`, sorted by muscle name.
    ///
    /// The highest-scoring muscle always rates `scale`, and any muscle with
    /// a positive score rates at least 1.
    pub fn ratings(&self, scale: u32) -> Vec<MuscleRating> {
        let max = self.max_score();
        let mut ratings: Vec<MuscleRating> = self
            .scores
            .iter()
            .map(|(&muscle, &score)| MuscleRating {
                muscle,
                score,
                rating: rate(score, max, scale),
            })
            .collect();

        ratings.sort_by(|a, b| a.muscle.display_name().cmp(b.muscle.display_name()));
        ratings
    }
}

fn rate(score: f64, max: f64, scale: u32) -> u32 {
    if max <= 0.0 || score <= 0.0 {
        return 0;
    }

    let rating = ((score / max) * f64::from(scale)).round() as u32;
    rating.clamp(1, scale)
}

/// Scores strength sets against a coefficient table.
#[derive(Debug, Clone, Default)]
pub struct MuscleLoadEngine {
    coefficients: CoefficientTable,
}

impl MuscleLoadEngine {
    pub fn new(coefficients: CoefficientTable) -> Self {
        Self { coefficients }
    }

    /// Accumulate weighted load per muscle.
    ///
    /// Unspecified/other classifications are ignored, as are muscles whose
    /// total stays at zero.
    pub fn score<'a>(&self, sets: impl IntoIterator<Item = &'a StrengthSet>) -> MuscleScores {
        let mut scores: BTreeMap<MuscleGroup, f64> = BTreeMap::new();

        for set in sets {
            let load = set_load(set);

            if set.primary_muscle_group.is_classified() {
                *scores.entry(set.primary_muscle_group).or_default() +=
                    load * self.coefficients.get(set.primary_muscle_group);
            }

            for &secondary in &set.secondary_muscle_groups {
                if secondary.is_classified() {
                    *scores.entry(secondary).or_default() +=
                        load * self.coefficients.get(secondary) * SECONDARY_FACTOR;
                }
            }
        }

        scores.retain(|_, score| *score > 0.0);
        MuscleScores { scores }
    }
}
