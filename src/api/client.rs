//! Broker REST API client with OAuth2 refresh-token authentication.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::models::{
    AccountPosition, ChainExpiration, ChainStrike, InstrumentType, MarketCandidate, OptionChain,
    OptionQuote,
};

use super::types::*;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Access tokens are valid for 15 minutes; refresh one minute early.
const TOKEN_LIFETIME_SECS: i64 = 14 * 60;

#[derive(Debug, Clone)]
struct AuthToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Client for the broker REST API.
///
/// Cheap to clone; clones share the cached access token.
#[derive(Clone)]
pub struct BrokerClient {
    http: Client,
    config: ApiConfig,
    token: Arc<RwLock<Option<AuthToken>>>,
}

impl BrokerClient {
    /// Create a new client. Authentication happens lazily on first request.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            config,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Exchange the refresh token for a fresh access token.
    async fn authenticate(&self) -> Result<String> {
        let url = format!("{}/oauth/token", self.config.api_url);

        let request = TokenRequest {
            grant_type: "refresh_token",
            refresh_token: &self.config.refresh_token,
            client_secret: &self.config.client_secret,
        };

        debug!("Refreshing access token");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to reach token endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Authentication failed: {} - {}", status, body);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        let access_token = token.access_token.clone();
        *self.token.write().await = Some(AuthToken {
            access_token: token.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(TOKEN_LIFETIME_SECS),
        });

        Ok(access_token)
    }

    /// Return a valid bearer token, refreshing if expired or missing.
    async fn bearer(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if Utc::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }
        self.authenticate().await
    }

    /// Authenticated GET returning the parsed body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.bearer().await?;
        let url = format!("{}{}", self.config.api_url, endpoint);

        debug!(url = %url, "API request");

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request failed: GET {}", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API request failed: GET {} - {} - {}", endpoint, status, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response: GET {}", endpoint))
    }

    // ==================== Accounts ====================

    /// List account numbers for the authenticated customer.
    pub async fn get_account_numbers(&self) -> Result<Vec<String>> {
        let response: Envelope<Items<AccountEntry>> =
            self.get_json("/customers/me/accounts", &[]).await?;

        Ok(response
            .data
            .items
            .into_iter()
            .filter_map(|entry| entry.account.map(|a| a.account_number))
            .collect())
    }

    /// Fetch balances for an account.
    pub async fn get_balances(&self, account_number: &str) -> Result<AccountBalances> {
        let endpoint = format!("/accounts/{}/balances", account_number);
        let response: Envelope<AccountBalances> = self.get_json(&endpoint, &[]).await?;
        Ok(response.data)
    }

    // ==================== Positions & Orders ====================

    /// Fetch all positions for an account, validated into domain records.
    pub async fn get_positions(&self, account_number: &str) -> Result<Vec<AccountPosition>> {
        let endpoint = format!("/accounts/{}/positions", account_number);
        let response: Envelope<Items<PositionEntry>> = self.get_json(&endpoint, &[]).await?;

        let positions = response
            .data
            .items
            .into_iter()
            .filter_map(|entry| {
                if entry.symbol.is_empty() {
                    warn!("Skipping position with empty symbol");
                    return None;
                }
                Some(AccountPosition {
                    instrument_type: InstrumentType::parse(&entry.instrument_type),
                    symbol: entry.symbol,
                    quantity: entry.quantity.unwrap_or(Decimal::ZERO),
                    average_open_price: entry.average_open_price.unwrap_or(Decimal::ZERO),
                    close_price: entry.close_price.unwrap_or(Decimal::ZERO),
                    multiplier: entry.multiplier.unwrap_or(dec!(100)),
                })
            })
            .collect();

        Ok(positions)
    }

    /// Fetch live (unfilled) orders for an account.
    pub async fn get_live_orders(&self, account_number: &str) -> Result<Vec<LiveOrder>> {
        let endpoint = format!("/accounts/{}/orders/live", account_number);
        let response: Envelope<Items<LiveOrder>> = self.get_json(&endpoint, &[]).await?;
        Ok(response.data.items)
    }

    // ==================== Market Data ====================

    /// Fetch IV rank and related metrics for a set of symbols.
    pub async fn get_market_metrics(&self, symbols: &[&str]) -> Result<Vec<MarketCandidate>> {
        let joined = symbols.join(",");
        let response: Envelope<Items<MarketMetricsEntry>> = self
            .get_json("/market-metrics", &[("symbols", joined.as_str())])
            .await?;

        let candidates = response
            .data
            .items
            .into_iter()
            .map(|entry| MarketCandidate {
                symbol: entry.symbol,
                iv_rank: entry.implied_volatility_index_rank.unwrap_or(0.0),
                iv_percentile: entry.implied_volatility_percentile.unwrap_or(0.0),
                liquidity_rating: entry.liquidity_rating.unwrap_or(0.0) as i32,
            })
            .collect();

        Ok(candidates)
    }

    /// Fetch the nested option chain for an underlying, with DTE computed
    /// against today. Expirations with unparseable dates are skipped.
    pub async fn get_option_chain(&self, symbol: &str) -> Result<OptionChain> {
        let endpoint = format!("/option-chains/{}/nested", symbol);
        let response: Envelope<ChainData> = self.get_json(&endpoint, &[]).await?;

        let today = Utc::now().date_naive();
        let expirations = response
            .data
            .expirations
            .into_iter()
            .filter_map(|entry| convert_expiration(entry, today))
            .collect();

        Ok(OptionChain {
            symbol: symbol.to_string(),
            expirations,
        })
    }
}

fn convert_expiration(entry: ExpirationEntry, today: NaiveDate) -> Option<ChainExpiration> {
    let date_str = entry.expiration_date?;
    let expiration_date = match NaiveDate::parse_from_str(&date_str, "%Y-%m-%d") {
        Ok(d) => d,
        Err(e) => {
            warn!(date = %date_str, error = %e, "Skipping expiration with bad date");
            return None;
        }
    };

    let strikes = entry
        .strikes
        .into_iter()
        .filter_map(|s| {
            Some(ChainStrike {
                strike_price: s.strike_price?,
                put: s.put.map(convert_quote),
                call: s.call.map(convert_quote),
            })
        })
        .collect();

    Some(ChainExpiration {
        expiration_date,
        dte: (expiration_date - today).num_days(),
        underlying_price: entry.underlying_price.unwrap_or(Decimal::ZERO),
        strikes,
    })
}

fn convert_quote(entry: QuoteEntry) -> OptionQuote {
    OptionQuote {
        delta: entry.delta.unwrap_or(0.0),
        bid: entry.bid.unwrap_or(Decimal::ZERO),
        ask: entry.ask.unwrap_or(Decimal::ZERO),
    }
}
