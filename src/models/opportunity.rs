//! Credit-spread opportunity produced by the scanner.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the chain the spread is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadKind {
    PutCredit,
    CallCredit,
}

impl fmt::Display for SpreadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PutCredit => write!(f, "Put Credit Spread"),
            Self::CallCredit => write!(f, "Call Credit Spread"),
        }
    }
}

impl SpreadKind {
    /// Option type sold, for order leg display.
    pub fn leg_type(&self) -> &'static str {
        match self {
            Self::PutCredit => "Put",
            Self::CallCredit => "Call",
        }
    }
}

/// A fully specified credit-spread candidate.
///
/// Invariants (enforced by the scanner, relied upon by the sizer):
/// width > 0, credit >= width/3, max_loss >= 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSpreadOpportunity {
    pub symbol: String,
    pub strategy: SpreadKind,
    pub iv_rank: f64,
    pub expiration: NaiveDate,
    pub dte: i64,

    /// Strike of the leg sold
    pub short_strike: Decimal,

    /// Strike of the protective leg bought
    pub long_strike: Decimal,

    /// Dollar distance between the strikes
    pub width: Decimal,

    /// Net premium collected per spread, from mid prices
    pub credit: Decimal,

    /// credit x 100, per spread
    pub max_profit: Decimal,

    /// (width - credit) x 100, per spread
    pub max_loss: Decimal,

    /// |short leg delta| x 100 -- an approximation, not a calibrated probability
    pub pop: f64,

    /// credit / width x 100
    pub return_on_risk: Decimal,
}
