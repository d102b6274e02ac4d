//! Loss warnings emitted by the position monitor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How badly a losing position is deteriorating.
///
/// Ordered: Ok < Watch < Warning < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Ok,
    Watch,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Watch => "WATCH",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A losing position flagged by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossWarning {
    pub symbol: String,
    pub quantity: Decimal,
    pub unrealized_pnl: Decimal,
    pub loss_pct: Decimal,
    pub severity: Severity,
    pub current_price: Decimal,
    pub avg_price: Decimal,
}

impl LossWarning {
    /// Exit action text for the report, keyed off severity.
    pub fn action(&self) -> &'static str {
        match self.severity {
            Severity::Critical => "EXIT IMMEDIATELY",
            Severity::Warning => "CONSIDER EXITING",
            _ => "MONITOR CLOSELY",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self.severity {
            Severity::Critical => "Loss has exceeded acceptable threshold (>2x max loss)",
            Severity::Warning => "Position is significantly underwater (>50% loss)",
            _ => "Position showing moderate loss",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Watch);
        assert!(Severity::Watch > Severity::Ok);
    }
}
