// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Merging provider results into the activity being enriched.
//!
//! Rules:
//! - Name: first non-empty override wins unless a later result is marked
//!   `override_name`; suffixes are appended after all providers ran.
//! - Description: trimmed fragments joined by a blank line in execution
//!   order, branding fragments last.
//! - Tags: union in order of first appearance.
//! - Streams: written per second index; only positive HR/power values
//!   overwrite, so the last non-empty stream for a channel wins.
//! - Type: last specified value wins.

use crate::models::{Activity, EnrichmentResult, Record, Session, Streams};
use std::collections::HashMap;

const FRAGMENT_SEPARATOR: &str = "\n\n";

/// The single activity instance a pipeline run mutates.
///
/// Providers see the activity as merged so far; branding fragments and name
/// suffixes are only applied by [`ActivityAccumulator::finish`].
#[derive(Debug, Clone)]
pub struct ActivityAccumulator {
    activity: Activity,
    base_description: String,
    fragments: Vec<String>,
    branding_fragments: Vec<String>,
    name_claimed: bool,
    name_suffixes: Vec<String>,
}

impl ActivityAccumulator {
    pub fn new(activity: Activity) -> Self {
        let base_description = activity.description.trim().to_string();
        Self {
            activity,
            base_description,
            fragments: Vec::new(),
            branding_fragments: Vec::new(),
            name_claimed: false,
            name_suffixes: Vec::new(),
        }
    }

    /// Activity as merged so far.
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Merge one provider's result.
    pub fn apply(&mut self, result: EnrichmentResult, is_branding: bool) {
        if let Some(name) = result.name.as_deref().map(str::trim) {
            if !name.is_empty() && (!self.name_claimed || result.override_name) {
                self.activity.name = name.to_string();
                self.name_claimed = true;
            }
        }

        if let Some(suffix) = result.name_suffix.filter(|s| !s.trim().is_empty()) {
            self.name_suffixes.push(suffix);
        }

        if let Some(activity_type) = result.activity_type.filter(|t| t.is_specified()) {
            self.activity.activity_type = activity_type;
        }

        if let Some(fragment) = result.description.as_deref().map(str::trim) {
            if !fragment.is_empty() {
                if is_branding {
                    self.branding_fragments.push(fragment.to_string());
                } else {
                    self.fragments.push(fragment.to_string());
                    self.activity.description = self.joined_description(false);
                }
            }
        }

        for tag in result.tags {
            if !tag.is_empty() && !self.activity.tags.contains(&tag) {
                self.activity.tags.push(tag);
            }
        }

        merge_streams(&mut self.activity, &result.streams);

        self.activity.enrichment_metadata.extend(result.metadata);
    }

    /// Final activity with branding and suffixes applied.
    pub fn finish(mut self) -> Activity {
        self.activity.description = self.joined_description(true);
        for suffix in &self.name_suffixes {
            self.activity.name.push_str(suffix);
        }
        self.activity
    }

    fn joined_description(&self, with_branding: bool) -> String {
        let base = Some(&self.base_description).filter(|d| !d.is_empty());
        let branding: &[String] = if with_branding {
            self.branding_fragments.as_slice()
        } else {
            &[]
        };

        base.into_iter()
            .chain(self.fragments.iter())
            .chain(branding.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(FRAGMENT_SEPARATOR)
    }
}

/// Write per-second stream values into the activity's records.
///
/// Records are matched by whole-second offset from the activity start;
/// missing records are created in the last session.
pub fn merge_streams(activity: &mut Activity, streams: &Streams) {
    if streams.is_empty() {
        return;
    }

    let len = streams
        .heart_rate
        .len()
        .max(streams.power.len())
        .max(streams.position.len());
    let start = activity.start_time;

    if activity.sessions.is_empty() {
        activity.sessions.push(Session {
            start_time: Some(start),
            total_elapsed_secs: u32::try_from(len).unwrap_or(u32::MAX),
            ..Default::default()
        });
    }

    // Offset in seconds -> (session index, record index)
    let mut index: HashMap<i64, (usize, usize)> = HashMap::new();
    for (s, session) in activity.sessions.iter().enumerate() {
        for (r, record) in session.records.iter().enumerate() {
            index
                .entry((record.timestamp - start).num_seconds())
                .or_insert((s, r));
        }
    }

    let last_session = activity.sessions.len() - 1;
    let mut created = false;

    for offset in 0..len {
        let heart_rate = streams.heart_rate.get(offset).copied().filter(|v| *v > 0);
        let power = streams.power.get(offset).copied().filter(|v| *v > 0);
        let position = streams.position.get(offset).copied();

        if heart_rate.is_none() && power.is_none() && position.is_none() {
            continue;
        }

        let key = offset as i64;
        let (s, r) = match index.get(&key) {
            Some(&loc) => loc,
            None => {
                let records = &mut activity.sessions[last_session].records;
                records.push(Record::at(start + chrono::Duration::seconds(key)));
                created = true;
                let loc = (last_session, records.len() - 1);
                index.insert(key, loc);
                loc
            }
        };

        let record = &mut activity.sessions[s].records[r];
        if heart_rate.is_some() {
            record.heart_rate = heart_rate;
        }
        if power.is_some() {
            record.power = power;
        }
        if position.is_some() {
            record.position = position;
        }
    }

    if created {
        activity.sessions[last_session]
            .records
            .sort_by_key(|record| record.timestamp);
    }
}
