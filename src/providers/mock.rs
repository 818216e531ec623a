// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider that simulates each outcome, for exercising pipelines.

use crate::error::ProviderError;
use crate::models::{Activity, EnrichmentResult, UserContext};
use crate::providers::{input, list_input, Provider, ProviderInputs};
use async_trait::async_trait;

pub struct MockProvider;

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn enrich(
        &self,
        activity: &Activity,
        _user: &UserContext,
        inputs: &ProviderInputs,
        force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        let behavior = input(inputs, "behavior").unwrap_or("success");

        match behavior {
            "success" => Ok(EnrichmentResult::default()
                .with_name(input(inputs, "name").unwrap_or("Mock Activity"))
                .with_description(
                    input(inputs, "description")
                        .unwrap_or("This activity was enriched by the mock provider"),
                )
                .with_metadata("mock_provider", "true")
                .with_metadata("behavior", "success")),

            "lag" if force_accept => Ok(EnrichmentResult::default()
                .with_name("Mock Activity (Lag Exhausted)")
                .with_description("This activity was enriched after lag retry was exhausted")
                .with_metadata("mock_provider", "true")
                .with_metadata("behavior", "lag")
                .with_metadata("lag_exhausted", "true")),

            "lag" => Err(ProviderError::retryable("Mock provider simulating data lag")),

            "fail" => Err(ProviderError::Fatal(
                input(inputs, "error")
                    .unwrap_or("Mock provider simulated failure")
                    .to_string(),
            )),

            "halt" => Err(ProviderError::halt(
                input(inputs, "reason").unwrap_or("Mock provider halted pipeline"),
            )),

            "wait" => {
                let mut fields = list_input(inputs, "fields");
                if fields.is_empty() {
                    fields.push("description".to_string());
                }
                Err(ProviderError::WaitForInput {
                    key: activity.stable_key(),
                    required_fields: fields,
                })
            }

            other => Err(ProviderError::Fatal(format!("unknown mock behavior: {}", other))),
        }
    }
}
