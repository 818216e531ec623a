// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Standardized activity model shared by every provider.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Activity being enriched. One instance is owned by the orchestrator per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Originating platform (e.g. "hevy", "strava")
    pub source: String,
    /// ID of the activity on the originating platform
    pub external_id: String,
    /// Activity name/title
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Start date/time (UTC)
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// Metadata collected from providers during enrichment
    #[serde(default)]
    pub enrichment_metadata: HashMap<String, String>,
}

impl Activity {
    /// Stable key for per-activity records such as pending inputs.
    pub fn stable_key(&self) -> String {
        format!("{}:{}", self.source, self.external_id)
    }

    /// Total elapsed time in seconds across all sessions.
    pub fn elapsed_secs(&self) -> u32 {
        self.sessions.iter().map(|s| s.total_elapsed_secs).sum()
    }

    /// End of the activity window.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::seconds(i64::from(self.elapsed_secs()))
    }

    /// All strength sets aggregated across sessions, in order.
    pub fn strength_sets(&self) -> impl Iterator<Item = &StrengthSet> {
        self.sessions.iter().flat_map(|s| s.strength_sets.iter())
    }

    /// Timestamps of every record across sessions, in order.
    pub fn record_timestamps(&self) -> Vec<DateTime<Utc>> {
        self.sessions
            .iter()
            .flat_map(|s| s.records.iter().map(|r| r.timestamp))
            .collect()
    }
}

/// One session of an activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_elapsed_secs: u32,
    #[serde(default)]
    pub strength_sets: Vec<StrengthSet>,
    #[serde(default)]
    pub records: Vec<Record>,
}

/// A single strength-training set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrengthSet {
    pub exercise_name: String,
    #[serde(default)]
    pub reps: u32,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub distance_meters: f64,
    #[serde(default)]
    pub duration_secs: u32,
    /// "normal", "warmup", "failure", "dropset"
    #[serde(default)]
    pub set_type: String,
    #[serde(default)]
    pub superset_id: String,
    #[serde(default)]
    pub primary_muscle_group: MuscleGroup,
    #[serde(default)]
    pub secondary_muscle_groups: Vec<MuscleGroup>,
}

/// Time-indexed sample record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub position: Option<Position>,
    pub heart_rate: Option<u32>,
    pub power: Option<u32>,
}

impl Record {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            position: None,
            heart_rate: None,
            power: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

/// Activity type (Strava naming).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    #[default]
    Unspecified,
    Run,
    Ride,
    VirtualRide,
    Walk,
    Hike,
    Swim,
    WeightTraining,
    Workout,
    Yoga,
    Rowing,
    Crossfit,
    Elliptical,
    Other,
}

impl ActivityType {
    const ALL: [ActivityType; 14] = [
        ActivityType::Unspecified,
        ActivityType::Run,
        ActivityType::Ride,
        ActivityType::VirtualRide,
        ActivityType::Walk,
        ActivityType::Hike,
        ActivityType::Swim,
        ActivityType::WeightTraining,
        ActivityType::Workout,
        ActivityType::Yoga,
        ActivityType::Rowing,
        ActivityType::Crossfit,
        ActivityType::Elliptical,
        ActivityType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Unspecified => "Unspecified",
            ActivityType::Run => "Run",
            ActivityType::Ride => "Ride",
            ActivityType::VirtualRide => "VirtualRide",
            ActivityType::Walk => "Walk",
            ActivityType::Hike => "Hike",
            ActivityType::Swim => "Swim",
            ActivityType::WeightTraining => "WeightTraining",
            ActivityType::Workout => "Workout",
            ActivityType::Yoga => "Yoga",
            ActivityType::Rowing => "Rowing",
            ActivityType::Crossfit => "Crossfit",
            ActivityType::Elliptical => "Elliptical",
            ActivityType::Other => "Other",
        }
    }

    /// Parse a type name, ignoring case, spaces and underscores.
    ///
    /// Returns `None` for unknown names; "Unspecified" is never returned.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();

        Self::ALL
            .iter()
            .copied()
            .filter(|t| *t != ActivityType::Unspecified)
            .find(|t| t.as_str().to_lowercase() == wanted)
    }

    pub fn is_specified(&self) -> bool {
        *self != ActivityType::Unspecified
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Muscle group classification for strength sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    #[default]
    Unspecified,
    Quadriceps,
    Hamstrings,
    Glutes,
    Calves,
    Adductors,
    Abductors,
    Lats,
    UpperBack,
    LowerBack,
    Neck,
    Traps,
    Chest,
    Shoulders,
    Biceps,
    Triceps,
    Forearms,
    Abdominals,
    Cardio,
    FullBody,
    Other,
}

impl MuscleGroup {
    /// Human-readable name, e.g. "Upper Back".
    pub fn display_name(&self) -> &'static str {
        match self {
            MuscleGroup::Unspecified => "Unspecified",
            MuscleGroup::Quadriceps => "Quadriceps",
            MuscleGroup::Hamstrings => "Hamstrings",
            MuscleGroup::Glutes => "Glutes",
            MuscleGroup::Calves => "Calves",
            MuscleGroup::Adductors => "Adductors",
            MuscleGroup::Abductors => "Abductors",
            MuscleGroup::Lats => "Lats",
            MuscleGroup::UpperBack => "Upper Back",
            MuscleGroup::LowerBack => "Lower Back",
            MuscleGroup::Neck => "Neck",
            MuscleGroup::Traps => "Traps",
            MuscleGroup::Chest => "Chest",
            MuscleGroup::Shoulders => "Shoulders",
            MuscleGroup::Biceps => "Biceps",
            MuscleGroup::Triceps => "Triceps",
            MuscleGroup::Forearms => "Forearms",
            MuscleGroup::Abdominals => "Abdominals",
            MuscleGroup::Cardio => "Cardio",
            MuscleGroup::FullBody => "Full Body",
            MuscleGroup::Other => "Other",
        }
    }

    /// True for real classifications (not unspecified/other).
    pub fn is_classified(&self) -> bool {
        !matches!(self, MuscleGroup::Unspecified | MuscleGroup::Other)
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
