// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Branding footer, always rendered at the end of the description.

use crate::error::ProviderError;
use crate::models::{Activity, EnrichmentResult, UserContext};
use crate::providers::{input, Provider, ProviderInputs};
use async_trait::async_trait;

pub const DEFAULT_MESSAGE: &str = "Posted via fitglue.tech 💪";

pub struct BrandingProvider;

#[async_trait]
impl Provider for BrandingProvider {
    fn name(&self) -> &'static str {
        "branding"
    }

    fn is_branding(&self) -> bool {
        true
    }

    async fn enrich(
        &self,
        _activity: &Activity,
        _user: &UserContext,
        inputs: &ProviderInputs,
        _force_accept: bool,
    ) -> Result<EnrichmentResult, ProviderError> {
        let message = input(inputs, "message").unwrap_or(DEFAULT_MESSAGE);
        Ok(EnrichmentResult::default()
            .with_description(message)
            .with_metadata("message", message))
    }
}
