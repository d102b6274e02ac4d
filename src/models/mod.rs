//! Data models for market candidates, option chains, spreads, and positions.

mod candidate;
mod chain;
mod opportunity;
mod position;
mod warning;

pub use candidate::MarketCandidate;
pub use chain::{ChainExpiration, ChainStrike, OptionChain, OptionQuote};
pub use opportunity::{CreditSpreadOpportunity, SpreadKind};
pub use position::{AccountPosition, InstrumentType, PositionKey};
pub use warning::{LossWarning, Severity};
