// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables via secret bindings,
//! so everything is read from the environment once at startup.

use std::env;

/// Cloud Tasks queue that carries enrichment runs and their delayed retries.
pub const ENRICHMENT_QUEUE_NAME: &str = "enrichment-pipeline";

/// Once an activity has been waiting this long, providers must accept
/// partial upstream data instead of asking for another retry.
pub const LAG_BUDGET_SECS: i64 = 15 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Cloud Tasks location
    pub gcp_region: String,
    /// Base URL that delayed retry tasks call back into
    pub service_url: String,
    /// Use in-memory stores instead of Firestore (local development)
    pub use_in_memory_db: bool,

    // --- Secrets ---
    pub fitbit_client_id: String,
    pub fitbit_client_secret: String,
    pub strava_client_id: String,
    pub strava_client_secret: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-central1".to_string()),
            service_url: env::var("SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            use_in_memory_db: env::var("USE_IN_MEMORY_DB")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),

            fitbit_client_id: required("FITBIT_CLIENT_ID")?,
            fitbit_client_secret: required("FITBIT_CLIENT_SECRET")?,
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            strava_client_secret: required("STRAVA_CLIENT_SECRET")?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-central1".to_string(),
            service_url: "http://localhost:8080".to_string(),
            use_in_memory_db: true,
            fitbit_client_id: "fitbit_test_id".to_string(),
            fitbit_client_secret: "fitbit_test_secret".to_string(),
            strava_client_id: "strava_test_id".to_string(),
            strava_client_secret: "strava_test_secret".to_string(),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("FITBIT_CLIENT_ID", "fb_id");
        env::set_var("FITBIT_CLIENT_SECRET", " fb_secret \n");
        env::set_var("STRAVA_CLIENT_ID", "st_id");
        env::set_var("STRAVA_CLIENT_SECRET", "st_secret");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.fitbit_client_id, "fb_id");
        assert_eq!(config.fitbit_client_secret, "fb_secret");
        assert_eq!(config.strava_client_id, "st_id");
        assert_eq!(config.port, 8080);
    }
}
