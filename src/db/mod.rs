// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, with an in-memory stand-in).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::InMemoryDb;

use crate::error::AppError;
use crate::models::{OAuthProvider, PendingInput, UserTokens};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const PENDING_INPUTS: &str = "pending_inputs";
    /// OAuth tokens keyed by `{user_id}_{provider}`
    pub const INTEGRATION_TOKENS: &str = "integration_tokens";
}

/// Persistence for paused pipeline runs.
///
/// The pipeline never writes `input_data`; only operators do.
#[async_trait]
pub trait PendingInputStore: Send + Sync {
    async fn get_pending_input(&self, key: &str) -> Result<Option<PendingInput>, AppError>;

    /// Create the record unless one already exists for its key.
    ///
    /// Returns `false` when a record was already present.
    async fn create_pending_input(&self, input: &PendingInput) -> Result<bool, AppError>;

    async fn update_pending_input(&self, input: &PendingInput) -> Result<(), AppError>;

    async fn delete_pending_input(&self, key: &str) -> Result<(), AppError>;
}

/// Persistence for third-party OAuth tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_tokens(
        &self,
        user_id: &str,
        provider: OAuthProvider,
    ) -> Result<Option<UserTokens>, AppError>;

    /// Replace both tokens in a single write.
    async fn set_tokens(
        &self,
        user_id: &str,
        provider: OAuthProvider,
        tokens: &UserTokens,
    ) -> Result<(), AppError>;
}

/// Document ID for a user's tokens with one provider.
pub fn token_doc_id(user_id: &str, provider: OAuthProvider) -> String {
    format!("{}_{}", urlencoding::encode(user_id), provider.as_str())
}

/// Document ID for a pending input key (`source:external_id`).
pub fn pending_input_doc_id(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}
