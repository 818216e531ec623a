// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Text summary of a strength workout.
//!
//! Exercises are listed in the order they first appear. Runs of identical
//! sets collapse into one entry (`3 × 10 × 100kg`), supersets get a shared
//! number emoji, and non-normal sets carry a type marker.

use crate::error::ProviderError;
use crate::models::{Activity, EnrichmentResult, StrengthSet, UserContext};
use crate::providers::{bool_input, input, Provider, ProviderInputs};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Write;

const HEADER: &str = "Workout Summary:\n";
const SUPERSET_MARKERS: [&str; 10] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟"];
const UNKNOWN_EXERCISE: &str = "Unknown Exercise";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Compact,
    Detailed,
    Verbose,
}

impl Format {
    fn from_input(value: Option<&str>) -> Self {
        match value {
            Some("compact") => Format::Compact,
            Some("verbose") => Format::Verbose,
            _ => Format::Detailed,
        }
    }
}

#[derive(Debug, Default)]
struct Stats {
    sets: usize,
    volume: f64,
    reps: u32,
    distance: f64,
    heaviest: Option<(f64, String)>,
}

impl Stats {
    fn collect<'a>(sets: impl Iterator<Item = &'a StrengthSet>) -> Self {
        let mut stats = Stats::default();
        for set in sets {
            stats.sets += 1;
            stats.reps += set.reps;
            stats.distance += set.distance_meters.max(0.0);

            if set.weight_kg > 0.0 {
                if set.reps > 0 {
                    stats.volume += set.weight_kg * f64::from(set.reps);
                } else if set.distance_meters > 0.0 {
                    stats.volume += set.weight_kg * set.distance_meters;
                }

                let heavier = stats
                    .heaviest
                    .as_ref()
                    .map_or(true, |(weight, _)| set.weight_kg > *weight);
                if heavier {
                    stats.heaviest = Some((set.weight_kg, set.exercise_name.clone()));
                }
            }
        }
        stats
    }

    fn line(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.sets > 0 {
            parts.push(format!("{} sets", self.sets));
        }
        if self.volume > 0.0 {
            parts.push(format!("{:.0}kg volume", self.volume));
        }
        if self.reps > 0 {
            parts.push(format!("{} reps", self.reps));
        }
        if self.distance > 0.0 {
            parts.push(format!("{:.1}km distance", self.distance / 1000.0));
        }
        if let Some((weight, exercise)) = &self.heaviest {
            parts.push(format!("Heaviest: {}kg ({})", format_weight(*weight), exercise));
        }

        (!parts.is_empty()).then(|| format!("📊 {}", parts.join(" • ")))
    }
}

struct ExerciseBlock<'a> {
    name: &'a str,
    sets: Vec<&'a StrengthSet>,
}

impl ExerciseBlock<'_> {
    fn superset_id(&self) -> Option<&str> {
        self.sets
            .first()
            .map(|s| s.superset_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Group sets by exercise name in first-appearance order.
fn blocks<'a>(sets: impl Iterator<Item = &'a StrengthSet>) -> Vec<ExerciseBlock<'a>> {
    let mut blocks: Vec<ExerciseBlock<'a>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for set in sets {
        let name = match set.exercise_name.trim() {
            "" => UNKNOWN_EXERCISE,
            _ => set.exercise_name.as_str(),
        };
        let i = *index.entry(name).or_insert_with(|| {
            blocks.push(ExerciseBlock {
                name,
                sets: Vec::new(),
            });
            blocks.len() - 1
        });
        blocks[i].sets.push(set);
    }
    blocks
}

/// "100" for whole kilograms, "62.5" otherwise.
fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{:.0}", weight)
    } else {
        format!("{:.1}", weight)
    }
}

fn format_duration(seconds: u32) -> String {
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    match (seconds / 60, seconds % 60) {
        (minutes, 0) => format!("{}m", minutes),
        (minutes, secs) => format!("{}:{:02}", minutes, secs),
    }
}

fn set_type_marker(set_type: &str) -> &'static str {
    match set_type {
        "warmup" => "[W] ",
        "failure" => "[F] ",
        "dropset" => "[D] ",
        _ => "",
    }
}

fn has_set_type(set: &StrengthSet) -> bool {
    !set.set_type.is_empty() && set.set_type != "normal"
}

fn format_set(set: &StrengthSet, format: Format) -> String {
    let body = if set.distance_meters > 0.0 || set.duration_secs > 0 {
        format_distance_duration(set, format)
    } else if set.weight_kg > 0.0 {
        match format {
            Format::Compact => format!("{}×{}kg", set.reps, format_weight(set.weight_kg)),
            Format::Detailed => format!("{} × {}kg", set.reps, format_weight(set.weight_kg)),
            Format::Verbose => format!("{} reps at {:.1} kilograms", set.reps, set.weight_kg),
        }
    } else {
        format!("{} reps", set.reps)
    };

    format!("{}{}", set_type_marker(&set.set_type), body)
}

fn format_distance_duration(set: &StrengthSet, format: Format) -> String {
    let distance = (set.distance_meters > 0.0).then(|| match format {
        Format::Verbose => format!("{:.1} meters", set.distance_meters),
        _ => format!("{:.0}m", set.distance_meters),
    });
    let duration = (set.duration_secs > 0).then(|| format_duration(set.duration_secs));

    match (distance, duration) {
        (Some(d), Some(t)) => format!("{} in {}", d, t),
        (Some(d), None) => d,
        (None, Some(t)) => t,
        (None, None) => String::new(),
    }
}

fn format_collapsed(count: usize, set: &str, format: Format) -> String {
    match format {
        Format::Compact => format!("{}×{}", count, set),
        Format::Detailed => format!("{} × {}", count, set),
        Format::Verbose => format!("{} sets of {}", count, set),
    }
}

pub struct WorkoutSummaryProvider;

#[async_trait]
impl Provider for WorkoutSummaryProvider {
    fn name(&self) -> &'static str {
        "workout-summary"
    }

    async fn enrich(
        &self,
        activity: &Activity,
        _user: &UserContext,
        inputs: &ProviderInputs,
        _force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        if activity.strength_sets().next().is_none() {
            return Ok(EnrichmentResult::default());
        }

        let format = Format::from_input(input(inputs, "format"));
        let show_stats = bool_input(inputs, "show_stats", true);

        let stats = Stats::collect(activity.strength_sets());
        let blocks = blocks(activity.strength_sets());

        let has_supersets = blocks.iter().any(|b| b.superset_id().is_some());
        let has_set_types = activity.strength_sets().any(has_set_type);

        let mut markers: HashMap<&str, &str> = HashMap::new();
        for id in blocks.iter().filter_map(|b| b.superset_id()) {
            let next = markers.len();
            if !markers.contains_key(id) && next < SUPERSET_MARKERS.len() {
                markers.insert(id, SUPERSET_MARKERS[next]);
            }
        }

        let mut out = String::from(HEADER);
        // Writing to a String cannot fail
        if show_stats {
            if let Some(line) = stats.line() {
                let _ = write!(out, "{}\n\n", line);
            }
        }
        if has_supersets {
            out.push_str("(Exercises with matching numbers are supersets - performed back-to-back)\n");
        }
        if has_set_types {
            out.push_str("([W]=Warmup, [F]=Failure, [D]=Dropset)\n");
        }
        if has_supersets || has_set_types {
            out.push('\n');
        }

        for block in &blocks {
            let marker = block
                .superset_id()
                .and_then(|id| markers.get(id))
                .map(|m| format!("{} ", m))
                .unwrap_or_default();

            let sets: Vec<String> = block.sets.iter().map(|s| format_set(s, format)).collect();
            let rendered = match sets.as_slice() {
                [only] => only.clone(),
                [first, rest @ ..] if rest.iter().all(|s| s == first) => {
                    format_collapsed(sets.len(), first, format)
                }
                _ => sets.join(", "),
            };

            let _ = writeln!(out, "- {}{}: {}", marker, block.name, rendered);
        }

        Ok(EnrichmentResult::default()
            .with_description(out)
            .with_metadata("exercise_count", blocks.len().to_string())
            .with_metadata("total_sets", stats.sets.to_string())
            .with_metadata("total_volume", format!("{:.2}", stats.volume))
            .with_metadata("total_reps", stats.reps.to_string())
            .with_metadata("has_stats", show_stats.to_string())
            .with_metadata("has_supersets", has_supersets.to_string())
            .with_metadata("has_set_types", has_set_types.to_string()))
    }
}
