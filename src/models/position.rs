//! Account position model and its stable identity key.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker instrument type, parsed from the wire string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentType {
    Equity,
    EquityOption,
    FutureOption,
    Other(String),
}

impl InstrumentType {
    /// Parse the broker's instrument-type label.
    pub fn parse(s: &str) -> Self {
        match s {
            "Equity" => Self::Equity,
            "Equity Option" => Self::EquityOption,
            "Future Option" => Self::FutureOption,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self, Self::EquityOption | Self::FutureOption)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Equity => "Equity",
            Self::EquityOption => "Equity Option",
            Self::FutureOption => "Future Option",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable identity for a position: symbol plus instrument type.
///
/// Quantity and price deliberately excluded so a size change on the same
/// instrument diffs as a change, not an exit/entry pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub symbol: String,
    pub instrument_type: InstrumentType,
}

/// A live broker position, captured at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPosition {
    /// Full broker symbol; for options this includes expiration and strike
    pub symbol: String,

    pub instrument_type: InstrumentType,

    /// Signed quantity: negative means short
    pub quantity: Decimal,

    /// Average entry price per unit
    pub average_open_price: Decimal,

    /// Most recent close/mark price per unit
    pub close_price: Decimal,

    /// Contract multiplier (100 for standard equity options)
    pub multiplier: Decimal,
}

impl AccountPosition {
    pub fn key(&self) -> PositionKey {
        PositionKey {
            symbol: self.symbol.clone(),
            instrument_type: self.instrument_type.clone(),
        }
    }

    /// Underlying ticker: for option symbols the part before the first space.
    pub fn underlying_symbol(&self) -> &str {
        self.symbol.split_whitespace().next().unwrap_or(&self.symbol)
    }

    /// Current market value of the position.
    pub fn market_value(&self) -> Decimal {
        self.quantity * self.close_price * self.multiplier
    }

    pub fn is_short(&self) -> bool {
        self.quantity < Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_instrument_type_parse() {
        assert_eq!(InstrumentType::parse("Equity"), InstrumentType::Equity);
        assert_eq!(
            InstrumentType::parse("Equity Option"),
            InstrumentType::EquityOption
        );
        assert!(InstrumentType::parse("Equity Option").is_option());
        assert!(!InstrumentType::parse("Equity").is_option());
        assert_eq!(
            InstrumentType::parse("Warrant"),
            InstrumentType::Other("Warrant".to_string())
        );
    }

    #[test]
    fn test_underlying_symbol() {
        let pos = AccountPosition {
            symbol: "SPY   260220P00565000".to_string(),
            instrument_type: InstrumentType::EquityOption,
            quantity: dec!(-7),
            average_open_price: dec!(1.85),
            close_price: dec!(0.90),
            multiplier: dec!(100),
        };
        assert_eq!(pos.underlying_symbol(), "SPY");
        assert!(pos.is_short());
    }

    #[test]
    fn test_key_ignores_quantity() {
        let mut pos = AccountPosition {
            symbol: "AAPL".to_string(),
            instrument_type: InstrumentType::Equity,
            quantity: dec!(10),
            average_open_price: dec!(150),
            close_price: dec!(155),
            multiplier: dec!(1),
        };
        let key_before = pos.key();
        pos.quantity = dec!(25);
        assert_eq!(key_before, pos.key());
    }
}
