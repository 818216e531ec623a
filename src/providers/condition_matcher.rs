// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Condition matcher: applies a title/description when every configured
//! condition holds.
//!
//! Conditions are ANDed. Any left unset is ignored. Times and weekdays are
//! compared in local time estimated from the start longitude.

use crate::error::ProviderError;
use crate::models::{Activity, ActivityType, EnrichmentResult, Position, UserContext};
use crate::providers::location::{distance_meters, estimated_local_time, start_position};
use crate::providers::{input, list_input, Provider, ProviderInputs};
use async_trait::async_trait;
use chrono::{NaiveTime, Timelike};

/// Match radius when `radius_m` is missing or malformed.
const DEFAULT_RADIUS_M: f64 = 200.0;

pub struct ConditionMatcherProvider;

#[derive(Debug, Clone, PartialEq)]
struct Conditions {
    activity_type: Option<ActivityType>,
    /// Three-letter weekday names, e.g. "Sat"
    days: Vec<String>,
    time_start: Option<u32>,
    time_end: Option<u32>,
    location: Option<(Position, f64)>,
}

/// Minutes since midnight for "HH:MM".
fn parse_hhmm(value: &str) -> Result<u32, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|t| t.hour() * 60 + t.minute())
        .map_err(|e| format!("invalid time {:?}: {}", value, e))
}

fn parse_coordinate(inputs: &ProviderInputs, key: &str) -> Result<f64, String> {
    input(inputs, key)
        .ok_or_else(|| format!("{} is required with location_lat", key))?
        .parse()
        .map_err(|e| format!("invalid {}: {}", key, e))
}

impl Conditions {
    fn from_inputs(inputs: &ProviderInputs) -> Result<Self, String> {
        let location = match input(inputs, "location_lat") {
            None => None,
            Some(_) => {
                let target = Position {
                    lat: parse_coordinate(inputs, "location_lat")?,
                    lng: parse_coordinate(inputs, "location_long")?,
                };
                let radius = input(inputs, "radius_m")
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(DEFAULT_RADIUS_M);
                Some((target, radius))
            }
        };

        Ok(Self {
            // Unknown type names impose no condition
            activity_type: input(inputs, "activity_type").and_then(ActivityType::from_name),
            days: list_input(inputs, "days"),
            time_start: input(inputs, "time_start").map(parse_hhmm).transpose()?,
            time_end: input(inputs, "time_end").map(parse_hhmm).transpose()?,
            location,
        })
    }

    /// The first condition the activity fails, if any.
    fn first_unmet(&self, activity: &Activity) -> Option<&'static str> {
        if let Some(wanted) = self.activity_type {
            if activity.activity_type != wanted {
                return Some("activity_type");
            }
        }

        let position = start_position(activity);
        let local = estimated_local_time(activity.start_time, position.map(|p| p.lng));

        if !self.days.is_empty() {
            let today = local.format("%a").to_string();
            if !self.days.iter().any(|d| d.eq_ignore_ascii_case(&today)) {
                return Some("days");
            }
        }

        let minutes = local.hour() * 60 + local.minute();
        if self.time_start.is_some_and(|start| minutes < start) {
            return Some("time_start");
        }
        if self.time_end.is_some_and(|end| minutes > end) {
            return Some("time_end");
        }

        if let Some((target, radius)) = self.location {
            match position {
                Some(p) if distance_meters(p, target) <= radius => {}
                _ => return Some("location"),
            }
        }

        None
    }
}

#[async_trait]
impl Provider for ConditionMatcherProvider {
    fn name(&self) -> &'static str {
        "condition-matcher"
    }

    async fn enrich(
        &self,
        activity: &Activity,
        _user: &UserContext,
        inputs: &ProviderInputs,
        _force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        let conditions = match Conditions::from_inputs(inputs) {
            Ok(conditions) => conditions,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid condition matcher configuration");
                return Ok(EnrichmentResult::default().with_metadata("config_error", e));
            }
        };

        if let Some(unmet) = conditions.first_unmet(activity) {
            tracing::debug!(condition = unmet, "Condition not met");
            return Ok(EnrichmentResult::default()
                .with_metadata("condition_matcher_applied", "false")
                .with_metadata("condition_unmet", unmet));
        }

        let mut result = EnrichmentResult::default().with_metadata("condition_matcher_applied", "true");
        if let Some(title) = input(inputs, "title_template") {
            result = result.with_name(title);
        }
        if let Some(description) = input(inputs, "description_template") {
            result = result.with_description(description);
        }
        Ok(result)
    }
}
