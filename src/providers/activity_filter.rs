// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity filter: halts the pipeline for activities the user excluded.
//!
//! Exclusion rules are checked first. If any inclusion rule is configured,
//! the activity must then match at least one of them.

use crate::error::ProviderError;
use crate::models::{Activity, ActivityType, EnrichmentResult, UserContext};
use crate::providers::{list_input, Provider, ProviderInputs};
use async_trait::async_trait;
use std::collections::HashMap;

pub struct ActivityFilterProvider;

fn type_matches(activity: &Activity, names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|name| ActivityType::from_name(name) == Some(activity.activity_type))
        .cloned()
}

/// First pattern contained in `text`, case-insensitively.
fn text_matches(text: &str, patterns: &[String]) -> Option<String> {
    let text = text.to_lowercase();
    patterns
        .iter()
        .map(|p| p.to_lowercase())
        .find(|p| text.contains(p.as_str()))
}

fn halt(reason: String, filter_reason: &str, detail: Option<(&str, String)>) -> ProviderError {
    let mut metadata = HashMap::from([
        ("filter_applied".to_string(), "true".to_string()),
        ("filter_reason".to_string(), filter_reason.to_string()),
    ]);
    if let Some((key, value)) = detail {
        metadata.insert(key.to_string(), value);
    }
    ProviderError::Halt { reason, metadata }
}

#[async_trait]
impl Provider for ActivityFilterProvider {
    fn name(&self) -> &'static str {
        "activity-filter"
    }

    async fn enrich(
        &self,
        activity: &Activity,
        _user: &UserContext,
        inputs: &ProviderInputs,
        _force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        if let Some(excluded) = type_matches(activity, &list_input(inputs, "exclude_activity_types")) {
            return Err(halt(
                format!("Activity type {} is excluded", activity.activity_type),
                "activity_type_excluded",
                Some(("excluded_type", excluded)),
            ));
        }

        if let Some(pattern) = text_matches(&activity.name, &list_input(inputs, "exclude_title_contains")) {
            return Err(halt(
                format!("Title contains excluded pattern: {}", pattern),
                "title_pattern_excluded",
                Some(("excluded_pattern", pattern)),
            ));
        }

        if let Some(pattern) = text_matches(
            &activity.description,
            &list_input(inputs, "exclude_description_contains"),
        ) {
            return Err(halt(
                format!("Description contains excluded pattern: {}", pattern),
                "description_pattern_excluded",
                Some(("excluded_pattern", pattern)),
            ));
        }

        let include_types = list_input(inputs, "include_activity_types");
        let include_title = list_input(inputs, "include_title_contains");
        let include_description = list_input(inputs, "include_description_contains");

        let has_inclusion_rules =
            !include_types.is_empty() || !include_title.is_empty() || !include_description.is_empty();

        if has_inclusion_rules {
            let included = type_matches(activity, &include_types).is_some()
                || text_matches(&activity.name, &include_title).is_some()
                || text_matches(&activity.description, &include_description).is_some();

            if !included {
                return Err(halt(
                    "Activity did not match any inclusion criteria".to_string(),
                    "not_included",
                    None,
                ));
            }
        }

        Ok(EnrichmentResult::default().with_metadata("filter_applied", "false"))
    }
}
