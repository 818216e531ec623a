// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Human-in-the-loop provider.
//!
//! Pauses the pipeline until an operator completes the pending input for
//! the activity, then applies the supplied title and description.

use crate::db::PendingInputStore;
use crate::error::ProviderError;
use crate::models::{Activity, EnrichmentResult, UserContext};
use crate::providers::{list_input, Provider, ProviderInputs};
use async_trait::async_trait;
use std::sync::Arc;

const DEFAULT_FIELD: &str = "description";

pub struct UserInputProvider {
    store: Arc<dyn PendingInputStore>,
}

impl UserInputProvider {
    pub fn new(store: Arc<dyn PendingInputStore>) -> Self {
        Self { store }
    }
}

fn required_fields(inputs: &ProviderInputs) -> Vec<String> {
    let fields = list_input(inputs, "fields");
    if fields.is_empty() {
        vec![DEFAULT_FIELD.to_string()]
    } else {
        fields
    }
}

#[async_trait]
impl Provider for UserInputProvider {
    fn name(&self) -> &'static str {
        "user_input"
    }

    async fn enrich(
        &self,
        activity: &Activity,
        _user: &UserContext,
        inputs: &ProviderInputs,
        _force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        let key = activity.stable_key();

        let pending = match self.store.get_pending_input(&key).await? {
            Some(pending) if pending.is_completed() => pending,
            _ => {
                return Err(ProviderError::WaitForInput {
                    key,
                    required_fields: required_fields(inputs),
                })
            }
        };

        tracing::info!(key = %key, "Applying completed user input");

        let mut result = EnrichmentResult::default().with_metadata("user_input_applied", "true");
        result.name = pending.input_data.get("title").cloned();
        result.description = pending.input_data.get("description").cloned();
        result.consumed_input = Some(key);
        Ok(result)
    }
}
