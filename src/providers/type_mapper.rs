// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maps activity types, e.g. Ride to VirtualRide for indoor trainers.

use crate::error::ProviderError;
use crate::models::{Activity, ActivityType, EnrichmentResult, UserContext};
use crate::providers::{input, Provider, ProviderInputs};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub struct TypeMapperProvider;

#[async_trait]
impl Provider for TypeMapperProvider {
    fn name(&self) -> &'static str {
        "type-mapper"
    }

    async fn enrich(
        &self,
        activity: &Activity,
        _user: &UserContext,
        inputs: &ProviderInputs,
        _force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        let Some(raw) = input(inputs, "type_mappings") else {
            return Ok(EnrichmentResult::default());
        };

        // Sorted so overlapping mappings resolve the same way every run
        let mappings: BTreeMap<String, String> = match serde_json::from_str(raw) {
            Ok(mappings) => mappings,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid type_mappings configuration");
                return Ok(EnrichmentResult::default()
                    .with_metadata("config_error", format!("invalid type_mappings: {}", e)));
            }
        };

        let current = activity.activity_type;
        let mapping = mappings.iter().find_map(|(from, to)| {
            if ActivityType::from_name(from) != Some(current) {
                return None;
            }
            ActivityType::from_name(to).map(|new_type| (from, to, new_type))
        });

        let Some((from, to, new_type)) = mapping else {
            return Ok(EnrichmentResult::default());
        };

        tracing::debug!(original = %current, new = %new_type, "Mapped activity type");

        Ok(EnrichmentResult {
            activity_type: Some(new_type),
            ..Default::default()
        }
        .with_metadata("original_type", current.as_str())
        .with_metadata("new_type", new_type.as_str())
        .with_metadata("mapping_used", format!("{} → {}", from, to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn ride() -> Activity {
        Activity {
            source: "strava".to_string(),
            external_id: "1".to_string(),
            name: String::new(),
            description: String::new(),
            activity_type: ActivityType::Ride,
            tags: vec![],
            start_time: Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap(),
            sessions: vec![],
            enrichment_metadata: HashMap::new(),
        }
    }

    async fn map(mappings: &str) -> EnrichmentResult {
        let inputs = HashMap::from([("type_mappings".to_string(), mappings.to_string())]);
        let user = UserContext {
            user_id: "u1".to_string(),
        };
        TypeMapperProvider
            .enrich(&ride(), &user, &inputs, false)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_maps_case_insensitively() {
        let result = map(r#"{"ride": "Virtual Ride"}"#).await;
        assert_eq!(result.activity_type, Some(ActivityType::VirtualRide));
        assert_eq!(result.metadata["original_type"], "Ride");
        assert_eq!(result.metadata["new_type"], "VirtualRide");
        assert_eq!(result.metadata["mapping_used"], "ride → Virtual Ride");
    }

    #[tokio::test]
    async fn test_unknown_target_ignored() {
        let result = map(r#"{"Ride": "Teleport"}"#).await;
        assert_eq!(result, EnrichmentResult::default());
    }

    #[tokio::test]
    async fn test_malformed_json_is_noop_with_config_error() {
        let result = map("{not json").await;
        assert!(result.activity_type.is_none());
        assert!(result.metadata["config_error"].starts_with("invalid type_mappings"));
    }
}
