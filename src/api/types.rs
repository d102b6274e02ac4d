//! Wire types for the broker REST API.
//!
//! The API uses kebab-case keys and frequently serializes numbers as
//! strings, so numeric fields go through lenient deserializers and are
//! validated here before anything reaches the core.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Standard `{"data": ...}` envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Standard `{"items": [...]}` collection wrapper.
#[derive(Debug, Deserialize)]
pub struct Items<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Accepts a number, a numeric string, or null.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(f64),
    Str(String),
}

/// Deserialize an optional f64 that may arrive as a string.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumOrStr>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumOrStr::Num(n)) => Some(n),
        Some(NumOrStr::Str(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}

/// Deserialize an optional Decimal that may arrive as a string.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumOrStr>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumOrStr::Num(n)) => Decimal::try_from(n).ok(),
        Some(NumOrStr::Str(s)) => s.trim().parse::<Decimal>().ok(),
        None => None,
    })
}

// ==================== OAuth ====================

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'a str,
    pub refresh_token: &'a str,
    pub client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

// ==================== Accounts & Balances ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AccountEntry {
    pub account: Option<AccountDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AccountDetails {
    pub account_number: String,
}

/// Parsed account balances.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AccountBalances {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub net_liquidating_value: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub cash_balance: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub equity_buying_power: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub derivative_buying_power: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub maintenance_requirement: Option<Decimal>,
}

// ==================== Positions ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PositionEntry {
    #[serde(default)]
    pub symbol: String,

    #[serde(default)]
    pub instrument_type: String,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub quantity: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub average_open_price: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub close_price: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub multiplier: Option<Decimal>,
}

// ==================== Orders ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LiveOrder {
    #[serde(default)]
    pub order_type: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub legs: Vec<OrderLeg>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrderLeg {
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub quantity: Option<Decimal>,

    #[serde(default)]
    pub symbol: Option<String>,
}

// ==================== Market Metrics ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MarketMetricsEntry {
    #[serde(default)]
    pub symbol: String,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub implied_volatility_index_rank: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub implied_volatility_percentile: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub liquidity_rating: Option<f64>,
}

// ==================== Option Chains ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainData {
    #[serde(default)]
    pub expirations: Vec<ExpirationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExpirationEntry {
    #[serde(default)]
    pub expiration_date: Option<String>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub underlying_price: Option<Decimal>,

    #[serde(default)]
    pub strikes: Vec<StrikeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StrikeEntry {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub strike_price: Option<Decimal>,

    #[serde(default)]
    pub put: Option<QuoteEntry>,

    #[serde(default)]
    pub call: Option<QuoteEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QuoteEntry {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub delta: Option<f64>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub bid: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub ask: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_lenient_numbers_from_strings() {
        let json = r#"{
            "symbol": "SPY",
            "implied-volatility-index-rank": "68.5",
            "implied-volatility-percentile": 72.1,
            "liquidity-rating": "4"
        }"#;

        let entry: MarketMetricsEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.symbol, "SPY");
        assert_eq!(entry.implied_volatility_index_rank, Some(68.5));
        assert_eq!(entry.implied_volatility_percentile, Some(72.1));
        assert_eq!(entry.liquidity_rating, Some(4.0));
    }

    #[test]
    fn test_lenient_numbers_missing_and_garbage() {
        let json = r#"{"symbol": "XYZ", "implied-volatility-index-rank": "n/a"}"#;
        let entry: MarketMetricsEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.implied_volatility_index_rank, None);
        assert_eq!(entry.implied_volatility_percentile, None);
    }

    #[test]
    fn test_position_entry_kebab_case() {
        let json = r#"{
            "symbol": "SPY   260220P00565000",
            "instrument-type": "Equity Option",
            "quantity": "-7",
            "average-open-price": "1.85",
            "close-price": "0.90",
            "multiplier": 100
        }"#;

        let entry: PositionEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.quantity, Some(dec!(-7)));
        assert_eq!(entry.average_open_price, Some(dec!(1.85)));
        assert_eq!(entry.multiplier, Some(dec!(100)));
    }

    #[test]
    fn test_chain_envelope_parsing() {
        let json = r#"{
            "data": {
                "expirations": [{
                    "expiration-date": "2026-02-20",
                    "underlying-price": "565.20",
                    "strikes": [{
                        "strike-price": "565.0",
                        "put": {"delta": "-0.30", "bid": "1.80", "ask": "1.90"}
                    }]
                }]
            }
        }"#;

        let parsed: Envelope<ChainData> = serde_json::from_str(json).unwrap();
        let exp = &parsed.data.expirations[0];
        assert_eq!(exp.underlying_price, Some(dec!(565.20)));
        let put = exp.strikes[0].put.as_ref().unwrap();
        assert_eq!(put.delta, Some(-0.30));
        assert_eq!(put.bid, Some(dec!(1.80)));
    }
}
