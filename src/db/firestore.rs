// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Pending inputs (paused pipeline runs awaiting operator data)
//! - Integration tokens (third-party OAuth credentials)

use crate::db::{
    collections, pending_input_doc_id, token_doc_id, PendingInputStore, TokenStore,
};
use crate::error::AppError;
use crate::models::{OAuthProvider, PendingInput, UserTokens};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

// ─── Pending Input Operations ────────────────────────────────────

#[async_trait]
impl PendingInputStore for FirestoreDb {
    async fn get_pending_input(&self, key: &str) -> Result<Option<PendingInput>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PENDING_INPUTS)
            .obj()
            .one(&pending_input_doc_id(key))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_pending_input(&self, input: &PendingInput) -> Result<bool, AppError> {
        // Insert fails with ALREADY_EXISTS when a concurrent run created it first
        let result: Result<(), firestore::errors::FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::PENDING_INPUTS)
            .document_id(pending_input_doc_id(&input.activity_key))
            .object(input)
            .execute()
            .await;

        match result {
            Ok(()) => {
                tracing::info!(key = %input.activity_key, "Created pending input");
                Ok(true)
            }
            Err(firestore::errors::FirestoreError::DataConflictError(_)) => {
                tracing::debug!(key = %input.activity_key, "Pending input already exists");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn update_pending_input(&self, input: &PendingInput) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PENDING_INPUTS)
            .document_id(pending_input_doc_id(&input.activity_key))
            .object(input)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_pending_input(&self, key: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PENDING_INPUTS)
            .document_id(pending_input_doc_id(key))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

// ─── Token Operations ────────────────────────────────────────────

#[async_trait]
impl TokenStore for FirestoreDb {
    async fn get_tokens(
        &self,
        user_id: &str,
        provider: OAuthProvider,
    ) -> Result<Option<UserTokens>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::INTEGRATION_TOKENS)
            .obj()
            .one(&token_doc_id(user_id, provider))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_tokens(
        &self,
        user_id: &str,
        provider: OAuthProvider,
        tokens: &UserTokens,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::INTEGRATION_TOKENS)
            .document_id(token_doc_id(user_id, provider))
            .object(tokens)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add tokens to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(user_id, provider = %provider, "Stored refreshed tokens");
        Ok(())
    }
}
