//! Option chain models, validated at the adapter boundary.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Quote and delta for one side (put or call) of a strike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Option delta; negative for puts, positive for calls
    pub delta: f64,

    /// Best bid
    pub bid: Decimal,

    /// Best ask
    pub ask: Decimal,
}

impl OptionQuote {
    /// Mid price between bid and ask.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / dec!(2)
    }

    /// Whether both sides of the market are quoted.
    pub fn has_market(&self) -> bool {
        self.bid > Decimal::ZERO && self.ask > Decimal::ZERO
    }
}

/// One strike row of an expiration, with optional put/call quotes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStrike {
    pub strike_price: Decimal,
    pub put: Option<OptionQuote>,
    pub call: Option<OptionQuote>,
}

/// One expiration within a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainExpiration {
    pub expiration_date: NaiveDate,

    /// Days to expiration at fetch time
    pub dte: i64,

    pub underlying_price: Decimal,

    pub strikes: Vec<ChainStrike>,
}

impl ChainExpiration {
    /// Find the strike row matching `strike` within a one-cent tolerance.
    pub fn strike_at(&self, strike: Decimal) -> Option<&ChainStrike> {
        self.strikes
            .iter()
            .find(|s| (s.strike_price - strike).abs() < dec!(0.01))
    }
}

/// Full option chain for an underlying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    pub symbol: String,
    pub expirations: Vec<ChainExpiration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_price() {
        let quote = OptionQuote {
            delta: -0.30,
            bid: dec!(1.80),
            ask: dec!(1.90),
        };
        assert_eq!(quote.mid(), dec!(1.85));
        assert!(quote.has_market());
    }

    #[test]
    fn test_one_sided_quote_has_no_market() {
        let quote = OptionQuote {
            delta: -0.30,
            bid: dec!(0),
            ask: dec!(1.90),
        };
        assert!(!quote.has_market());
    }

    #[test]
    fn test_strike_lookup_tolerance() {
        let exp = ChainExpiration {
            expiration_date: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            dte: 45,
            underlying_price: dec!(100),
            strikes: vec![ChainStrike {
                strike_price: dec!(95.005),
                put: None,
                call: None,
            }],
        };

        assert!(exp.strike_at(dec!(95)).is_some());
        assert!(exp.strike_at(dec!(90)).is_none());
    }
}
