// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory stores for local development and tests.

use crate::db::{PendingInputStore, TokenStore};
use crate::error::AppError;
use crate::models::{OAuthProvider, PendingInput, UserTokens};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Process-local database backed by concurrent maps.
///
/// Clones share the same underlying data.
#[derive(Clone, Default)]
pub struct InMemoryDb {
    pending_inputs: Arc<DashMap<String, PendingInput>>,
    tokens: Arc<DashMap<(String, OAuthProvider), UserTokens>>,
    token_writes: Arc<AtomicUsize>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of token writes performed so far.
    pub fn token_write_count(&self) -> usize {
        self.token_writes.load(Ordering::SeqCst)
    }

    /// Number of stored pending inputs.
    pub fn pending_input_count(&self) -> usize {
        self.pending_inputs.len()
    }
}

#[async_trait]
impl PendingInputStore for InMemoryDb {
    async fn get_pending_input(&self, key: &str) -> Result<Option<PendingInput>, AppError> {
        Ok(self.pending_inputs.get(key).map(|entry| entry.clone()))
    }

    async fn create_pending_input(&self, input: &PendingInput) -> Result<bool, AppError> {
        match self.pending_inputs.entry(input.activity_key.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(input.clone());
                Ok(true)
            }
        }
    }

    async fn update_pending_input(&self, input: &PendingInput) -> Result<(), AppError> {
        self.pending_inputs
            .insert(input.activity_key.clone(), input.clone());
        Ok(())
    }

    async fn delete_pending_input(&self, key: &str) -> Result<(), AppError> {
        self.pending_inputs.remove(key);
        Ok(())
    }
}

#[async_trait]
impl TokenStore for InMemoryDb {
    async fn get_tokens(
        &self,
        user_id: &str,
        provider: OAuthProvider,
    ) -> Result<Option<UserTokens>, AppError> {
        Ok(self
            .tokens
            .get(&(user_id.to_string(), provider))
            .map(|entry| entry.clone()))
    }

    async fn set_tokens(
        &self,
        user_id: &str,
        provider: OAuthProvider,
        tokens: &UserTokens,
    ) -> Result<(), AppError> {
        self.tokens
            .insert((user_id.to_string(), provider), tokens.clone());
        self.token_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
