// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle for third-party integrations.
//!
//! Providers that call Fitbit or Strava ask the manager for an access token.
//! The manager returns the stored token while it is comfortably valid and
//! otherwise redeems the refresh token, persisting the rotated pair before
//! handing out the new access token.
//!
//! Refresh tokens are single-use. Every refresh for a `(user, provider)` key
//! runs under one async mutex that is held across the HTTP exchange and the
//! store write, so a second caller can never redeem a token that was just
//! rotated.

use crate::config::Config;
use crate::db::TokenStore;
use crate::error::{AppError, ProviderError};
use crate::models::{OAuthProvider, UserTokens};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tokens expiring within this window are refreshed proactively.
pub const PROACTIVE_REFRESH_WINDOW_SECS: i64 = 60;

/// Lifetime assumed when a token response carries no expiry at all.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

pub const FITBIT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";
pub const STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Key identifying one user's tokens with one provider.
pub type TokenKey = (String, OAuthProvider);

/// Shared per-key refresh locks.
pub type RefreshLocks = Arc<DashMap<TokenKey, Arc<Mutex<()>>>>;

/// How client credentials are presented to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthStyle {
    /// HTTP Basic auth header (Fitbit)
    Basic,
    /// `client_id` / `client_secret` in the form body (Strava)
    FormBody,
}

/// Token endpoint and client credentials for one provider.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub provider: OAuthProvider,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_style: ClientAuthStyle,
}

impl OAuthClientConfig {
    pub fn fitbit(client_id: &str, client_secret: &str) -> Self {
        Self {
            provider: OAuthProvider::Fitbit,
            token_url: FITBIT_TOKEN_URL.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_style: ClientAuthStyle::Basic,
        }
    }

    pub fn strava(client_id: &str, client_secret: &str) -> Self {
        Self {
            provider: OAuthProvider::Strava,
            token_url: STRAVA_TOKEN_URL.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_style: ClientAuthStyle::FormBody,
        }
    }

    /// Point at a different token endpoint (tests).
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

/// Errors from the token lifecycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TokenError {
    #[error("No {provider} integration linked for user {user_id}")]
    NotLinked {
        user_id: String,
        provider: OAuthProvider,
    },

    /// The provider rejected the refresh; the user has to relink.
    #[error("Token refresh rejected: {0}")]
    Refresh(String),

    /// Rate limit, upstream 5xx or network failure.
    #[error("Token refresh failed transiently: {0}")]
    Transient(String),

    #[error("Token store error: {0}")]
    Store(String),
}

impl From<AppError> for TokenError {
    fn from(err: AppError) -> Self {
        TokenError::Store(err.to_string())
    }
}

impl From<TokenError> for ProviderError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Transient(_) | TokenError::Store(_) => {
                ProviderError::retryable(err.to_string())
            }
            TokenError::NotLinked { .. } | TokenError::Refresh(_) => {
                ProviderError::Fatal(err.to_string())
            }
        }
    }
}

/// Token endpoint response. Fitbit sends `expires_in`, Strava sends both.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    scope: Option<String>,
}

/// Supplies valid access tokens, refreshing and persisting as needed.
pub struct TokenManager {
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    clients: HashMap<OAuthProvider, OAuthClientConfig>,
    refresh_locks: RefreshLocks,
    proactive_window: Duration,
}

impl TokenManager {
    pub fn new(store: Arc<dyn TokenStore>, clients: Vec<OAuthClientConfig>) -> Self {
        Self {
            http: reqwest::Client::new(),
            store,
            clients: clients.into_iter().map(|c| (c.provider, c)).collect(),
            refresh_locks: Arc::new(DashMap::new()),
            proactive_window: Duration::seconds(PROACTIVE_REFRESH_WINDOW_SECS),
        }
    }

    /// Manager for every provider configured in the environment.
    pub fn from_config(config: &Config, store: Arc<dyn TokenStore>) -> Self {
        Self::new(
            store,
            vec![
                OAuthClientConfig::fitbit(&config.fitbit_client_id, &config.fitbit_client_secret),
                OAuthClientConfig::strava(&config.strava_client_id, &config.strava_client_secret),
            ],
        )
    }

    /// Handle bound to one `(user, provider)` pair.
    pub fn handle(self: &Arc<Self>, user_id: &str, provider: OAuthProvider) -> TokenHandle {
        TokenHandle {
            manager: Arc::clone(self),
            key: (user_id.to_string(), provider),
        }
    }

    /// Get an access token that stays valid for at least the proactive window.
    pub async fn get_token(
        &self,
        user_id: &str,
        provider: OAuthProvider,
    ) -> Result<String, TokenError> {
        // ─── Fast path: stored token still valid (no lock) ───
        let tokens = self.load(user_id, provider).await?;
        if self.is_fresh(&tokens) {
            return Ok(tokens.access_token);
        }

        // ─── Serialize refreshes for this key ───
        let lock = self.lock_for(user_id, provider);
        let _guard = lock.lock().await;

        // Another caller may have refreshed while we waited
        let tokens = self.load(user_id, provider).await?;
        if self.is_fresh(&tokens) {
            tracing::debug!(user_id, provider = %provider, "Token refreshed by another caller");
            return Ok(tokens.access_token);
        }

        tracing::info!(user_id, provider = %provider, "Access token expiring, refreshing");
        self.refresh_and_store(user_id, provider, tokens).await
    }

    /// Refresh regardless of expiry, e.g. after the upstream API returned 401.
    pub async fn force_refresh(
        &self,
        user_id: &str,
        provider: OAuthProvider,
    ) -> Result<String, TokenError> {
        let lock = self.lock_for(user_id, provider);
        let _guard = lock.lock().await;

        // Read under the lock so we redeem the latest refresh token
        let tokens = self.load(user_id, provider).await?;

        tracing::info!(user_id, provider = %provider, "Forcing token refresh");
        self.refresh_and_store(user_id, provider, tokens).await
    }

    fn lock_for(&self, user_id: &str, provider: OAuthProvider) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry((user_id.to_string(), provider))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn is_fresh(&self, tokens: &UserTokens) -> bool {
        Utc::now() + self.proactive_window < tokens.expires_at
    }

    async fn load(&self, user_id: &str, provider: OAuthProvider) -> Result<UserTokens, TokenError> {
        self.store
            .get_tokens(user_id, provider)
            .await?
            .ok_or_else(|| TokenError::NotLinked {
                user_id: user_id.to_string(),
                provider,
            })
    }

    /// Redeem the refresh token and persist the new pair. Caller holds the lock.
    async fn refresh_and_store(
        &self,
        user_id: &str,
        provider: OAuthProvider,
        current: UserTokens,
    ) -> Result<String, TokenError> {
        let client = self.clients.get(&provider).ok_or_else(|| {
            TokenError::Refresh(format!("No OAuth client configured for {}", provider))
        })?;

        let response = self.exchange(client, &current.refresh_token).await?;
        let updated = apply_response(current, response, Utc::now());

        // Both tokens are written together; the old refresh token is now dead
        self.store.set_tokens(user_id, provider, &updated).await?;

        tracing::info!(
            user_id,
            provider = %provider,
            expires_at = %updated.expires_at,
            "Token refreshed and stored"
        );
        Ok(updated.access_token)
    }

    async fn exchange(
        &self,
        client: &OAuthClientConfig,
        refresh_token: &str,
    ) -> Result<TokenResponse, TokenError> {
        let request = self.http.post(&client.token_url);

        let request = match client.auth_style {
            ClientAuthStyle::Basic => request
                .basic_auth(&client.client_id, Some(&client.client_secret))
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ]),
            ClientAuthStyle::FormBody => request.form(&[
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| TokenError::Transient(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 || status.is_server_error() {
                tracing::warn!(provider = %client.provider, status = status.as_u16(), "Token endpoint unavailable");
                return Err(TokenError::Transient(format!("HTTP {}", status)));
            }

            if body.contains("invalid_grant") {
                tracing::warn!(provider = %client.provider, "Refresh token rejected (invalid_grant)");
                return Err(TokenError::Refresh(format!(
                    "{} refresh token is no longer valid; integration must be relinked",
                    client.provider
                )));
            }

            return Err(TokenError::Refresh(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| TokenError::Refresh(format!("Invalid token response: {}", e)))
    }
}

/// Merge a token response into the stored tokens.
///
/// `expires_at` wins over `expires_in`. A missing refresh token keeps the
/// current one; a missing scope keeps the current scopes.
fn apply_response(current: UserTokens, response: TokenResponse, now: DateTime<Utc>) -> UserTokens {
    let expires_at = response
        .expires_at
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .or_else(|| response.expires_in.map(|secs| now + Duration::seconds(secs)))
        .unwrap_or_else(|| now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

    let scopes = response
        .scope
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or(current.scopes);

    UserTokens {
        access_token: response.access_token,
        refresh_token: response.refresh_token.unwrap_or(current.refresh_token),
        expires_at,
        scopes,
    }
}

/// Token access for one `(user, provider)` pair.
#[derive(Clone)]
pub struct TokenHandle {
    manager: Arc<TokenManager>,
    key: TokenKey,
}

impl TokenHandle {
    pub fn user_id(&self) -> &str {
        &self.key.0
    }

    pub fn provider(&self) -> OAuthProvider {
        self.key.1
    }

    pub async fn get_token(&self) -> Result<String, TokenError> {
        self.manager.get_token(&self.key.0, self.key.1).await
    }

    pub async fn force_refresh(&self) -> Result<String, TokenError> {
        self.manager.force_refresh(&self.key.0, self.key.1).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn current() -> UserTokens {
        UserTokens {
            access_token: "old-access".to_string(),
            refresh_token: "old-refresh".to_string(),
            expires_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            scopes: vec!["heartrate".to_string()],
        }
    }

    fn response() -> TokenResponse {
        TokenResponse {
            access_token: "new-access".to_string(),
            refresh_token: Some("new-refresh".to_string()),
            expires_in: None,
            expires_at: None,
            scope: None,
        }
    }

    #[test]
    fn test_expires_at_wins_over_expires_in() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let resp = TokenResponse {
            expires_in: Some(3600),
            expires_at: Some(now.timestamp() + 100),
            ..response()
        };

        let updated = apply_response(current(), resp, now);
        assert_eq!(updated.expires_at, now + Duration::seconds(100));
    }

    #[test]
    fn test_expires_in_is_relative() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let resp = TokenResponse {
            expires_in: Some(28_800),
            ..response()
        };

        let updated = apply_response(current(), resp, now);
        assert_eq!(updated.expires_at, now + Duration::hours(8));
        assert_eq!(updated.refresh_token, "new-refresh");
    }

    #[test]
    fn test_missing_refresh_token_keeps_old() {
        let now = Utc::now();
        let resp = TokenResponse {
            refresh_token: None,
            scope: Some("heartrate activity".to_string()),
            ..response()
        };

        let updated = apply_response(current(), resp, now);
        assert_eq!(updated.refresh_token, "old-refresh");
        assert_eq!(updated.access_token, "new-access");
        assert_eq!(updated.scopes, vec!["heartrate", "activity"]);
    }

    #[test]
    fn test_error_classification() {
        let not_linked: ProviderError = TokenError::NotLinked {
            user_id: "u".to_string(),
            provider: OAuthProvider::Fitbit,
        }
        .into();
        assert!(matches!(not_linked, ProviderError::Fatal(_)));

        let transient: ProviderError = TokenError::Transient("HTTP 503".to_string()).into();
        assert!(transient.is_retryable());

        let rejected: ProviderError = TokenError::Refresh("invalid_grant".to_string()).into();
        assert!(!rejected.is_retryable());
    }
}
