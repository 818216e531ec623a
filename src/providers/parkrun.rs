// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Parkrun detection: runs starting at a known parkrun on a Saturday
//! morning (or Christmas/New Year's Day) get the event name and tags.

use crate::error::ProviderError;
use crate::models::{Activity, ActivityType, EnrichmentResult, Position, UserContext};
use crate::providers::location::{distance_meters, estimated_local_time, start_position};
use crate::providers::{bool_input, Provider, ProviderInputs};
use async_trait::async_trait;
use chrono::{Datelike, Timelike, Weekday};
use serde::Deserialize;

/// Bundled parkrun locations.
const BUILTIN_LOCATIONS: &str = include_str!("../../data/parkrun_locations.json");

/// A run must start this close to the event location.
const MATCH_RADIUS_M: f64 = 200.0;

/// Local start window in minutes since midnight (07:30 to 11:00).
const START_WINDOW: (u32, u32) = (7 * 60 + 30, 11 * 60);

/// Events held whatever the weekday, as (month, day).
const SPECIAL_EVENT_DAYS: [(u32, u32); 2] = [(12, 25), (1, 1)];

const DEFAULT_TAGS: &str = "Parkrun";

#[derive(Debug, Clone, Deserialize)]
pub struct ParkrunLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ParkrunLocation {
    fn position(&self) -> Position {
        Position {
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocationsError {
    #[error("Failed to parse parkrun locations: {0}")]
    ParseError(String),
}

pub struct ParkrunProvider {
    locations: Vec<ParkrunLocation>,
}

impl ParkrunProvider {
    pub fn new(locations: Vec<ParkrunLocation>) -> Self {
        Self { locations }
    }

    /// Provider using the bundled location list.
    pub fn builtin() -> Result<Self, LocationsError> {
        Self::load_from_json(BUILTIN_LOCATIONS)
    }

    pub fn load_from_json(json_data: &str) -> Result<Self, LocationsError> {
        let locations: Vec<ParkrunLocation> =
            serde_json::from_str(json_data).map_err(|e| LocationsError::ParseError(e.to_string()))?;
        Ok(Self::new(locations))
    }

    /// Closest known event within the match radius.
    fn nearest(&self, position: Position) -> Option<&ParkrunLocation> {
        self.locations
            .iter()
            .map(|loc| (loc, distance_meters(position, loc.position())))
            .filter(|(_, d)| *d <= MATCH_RADIUS_M)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(loc, _)| loc)
    }
}

/// Tags from the `tags` input. Absent means the default; blank means none.
fn tags(inputs: &ProviderInputs) -> Vec<String> {
    inputs
        .get("tags")
        .map_or(DEFAULT_TAGS, String::as_str)
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Provider for ParkrunProvider {
    fn name(&self) -> &'static str {
        "parkrun"
    }

    async fn enrich(
        &self,
        activity: &Activity,
        _user: &UserContext,
        inputs: &ProviderInputs,
        _force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        if activity.activity_type != ActivityType::Run {
            return Ok(EnrichmentResult::default());
        }

        let Some(event) = start_position(activity).and_then(|p| self.nearest(p)) else {
            return Ok(EnrichmentResult::default());
        };

        // Local time at the event, not wherever the GPS fix drifted
        let local = estimated_local_time(activity.start_time, Some(event.longitude));
        let is_special = SPECIAL_EVENT_DAYS.contains(&(local.month(), local.day()));
        if local.weekday() != Weekday::Sat && !is_special {
            return Ok(EnrichmentResult::default());
        }

        let minutes = local.hour() * 60 + local.minute();
        if minutes < START_WINDOW.0 || minutes > START_WINDOW.1 {
            return Ok(EnrichmentResult::default());
        }

        tracing::info!(event = %event.name, "Detected parkrun");

        let mut result = EnrichmentResult {
            tags: tags(inputs),
            ..Default::default()
        }
        .with_metadata("is_parkrun", "true")
        .with_metadata("parkrun_event", event.name.clone());

        if bool_input(inputs, "enable_titling", true) {
            result = result.with_name(event.name.clone());
        }
        Ok(result)
    }
}
