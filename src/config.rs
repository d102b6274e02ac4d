//! Broker API credentials, loaded from the environment.

use anyhow::{bail, Result};

const DEFAULT_API_URL: &str = "https://api.tastytrade.com";

/// Explicitly constructed API configuration, passed into each client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the broker REST API
    pub api_url: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// Long-lived OAuth2 refresh token
    pub refresh_token: String,
}

impl ApiConfig {
    /// Load credentials from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let client_secret = std::env::var("THETADESK_CLIENT_SECRET").unwrap_or_default();
        let refresh_token = std::env::var("THETADESK_REFRESH_TOKEN").unwrap_or_default();
        let api_url =
            std::env::var("THETADESK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let mut missing = Vec::new();
        if client_secret.is_empty() {
            missing.push("THETADESK_CLIENT_SECRET");
        }
        if refresh_token.is_empty() {
            missing.push("THETADESK_REFRESH_TOKEN");
        }
        if !missing.is_empty() {
            bail!(
                "Missing required environment variables: {}. Add them to your .env file.",
                missing.join(", ")
            );
        }

        Ok(Self {
            api_url,
            client_secret,
            refresh_token,
        })
    }
}
