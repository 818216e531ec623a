// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location helpers shared by the place-aware providers.

use crate::models::{Activity, Position};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use geo::{Distance, Haversine, Point};

/// First GPS fix of the activity, skipping records without a position.
pub(crate) fn start_position(activity: &Activity) -> Option<Position> {
    activity
        .sessions
        .iter()
        .flat_map(|s| s.records.iter())
        .filter_map(|r| r.position)
        .find(|p| p.lat != 0.0 || p.lng != 0.0)
}

/// Great-circle distance in meters.
pub(crate) fn distance_meters(a: Position, b: Position) -> f64 {
    Haversine.distance(Point::new(a.lng, a.lat), Point::new(b.lng, b.lat))
}

/// Approximate local wall-clock time from longitude (15 degrees per hour).
///
/// Activities carry no timezone, so this ignores DST and political
/// boundaries. Without a longitude the UTC time is used.
pub(crate) fn estimated_local_time(utc: DateTime<Utc>, longitude: Option<f64>) -> NaiveDateTime {
    let offset_secs = longitude.map_or(0, |lng| (lng / 15.0 * 3600.0).round() as i64);
    (utc + Duration::seconds(offset_secs)).naive_utc()
}
