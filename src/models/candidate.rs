//! A symbol that passed the IV-rank screen for one scan cycle.

use serde::{Deserialize, Serialize};

/// Market metrics snapshot for a single symbol, produced per scan cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketCandidate {
    /// Underlying symbol
    pub symbol: String,

    /// IV rank: where current IV sits in its trailing-year range (0-100)
    pub iv_rank: f64,

    /// Percentage of days in the past year with lower IV (0-100)
    pub iv_percentile: f64,

    /// Broker-assigned liquidity rating (higher is more liquid)
    pub liquidity_rating: i32,
}
