//! Automatic trade detection from daily position snapshots.
//!
//! Each run snapshots the account's positions, diffs the two most recent
//! snapshots, and journals detected entries and exits without any manual
//! bookkeeping. Positions are identified by symbol plus instrument type,
//! so an equity and an option on the same underlying never collide.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::api::BrokerClient;
use crate::journal::Journal;
use crate::models::{AccountPosition, PositionKey};

/// Quantity changes smaller than this are ignored.
const QTY_TOLERANCE: Decimal = dec!(0.01);

/// How far back a recommendation can be and still claim a detected entry.
const RECOMMENDATION_MATCH_DAYS: i64 = 7;

/// One position as recorded in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub symbol: String,
    pub instrument_type: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl SnapshotEntry {
    pub fn from_position(position: &AccountPosition) -> Self {
        Self {
            symbol: position.symbol.clone(),
            instrument_type: position.instrument_type.as_str().to_string(),
            quantity: position.quantity,
            price: position.close_price,
        }
    }

    fn key(&self) -> PositionKey {
        PositionKey {
            symbol: self.symbol.clone(),
            instrument_type: crate::models::InstrumentType::parse(&self.instrument_type),
        }
    }

    fn is_option(&self) -> bool {
        self.key().instrument_type.is_option()
    }

    /// First whitespace-separated token of an OCC-style option symbol.
    pub fn underlying(&self) -> &str {
        self.symbol.split_whitespace().next().unwrap_or(&self.symbol)
    }
}

/// A position whose size changed between snapshots.
#[derive(Debug, Clone)]
pub struct QuantityChange {
    pub symbol: String,
    pub instrument_type: String,
    pub previous: Decimal,
    pub current: Decimal,
}

/// Differences between two snapshots.
#[derive(Debug, Default)]
pub struct PositionChanges {
    pub entries: Vec<SnapshotEntry>,
    pub exits: Vec<SnapshotEntry>,
    pub quantity_changes: Vec<QuantityChange>,
}

impl PositionChanges {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.exits.is_empty() && self.quantity_changes.is_empty()
    }
}

/// Diff two snapshots keyed by (symbol, instrument type).
pub fn diff_snapshots(current: &[SnapshotEntry], previous: &[SnapshotEntry]) -> PositionChanges {
    let mut changes = PositionChanges::default();

    let prev_by_key: std::collections::HashMap<PositionKey, &SnapshotEntry> =
        previous.iter().map(|e| (e.key(), e)).collect();
    let curr_by_key: std::collections::HashMap<PositionKey, &SnapshotEntry> =
        current.iter().map(|e| (e.key(), e)).collect();

    for entry in current {
        match prev_by_key.get(&entry.key()) {
            None => changes.entries.push(entry.clone()),
            Some(prev) => {
                if (entry.quantity - prev.quantity).abs() > QTY_TOLERANCE {
                    changes.quantity_changes.push(QuantityChange {
                        symbol: entry.symbol.clone(),
                        instrument_type: entry.instrument_type.clone(),
                        previous: prev.quantity,
                        current: entry.quantity,
                    });
                }
            }
        }
    }

    for entry in previous {
        if !curr_by_key.contains_key(&entry.key()) {
            changes.exits.push(entry.clone());
        }
    }

    changes
}

/// Snapshots positions and auto-journals detected trades.
pub struct TradeDetector {
    client: BrokerClient,
    journal: Journal,
    /// Residual debit assumed when closing legs we only saw disappear
    assumed_exit_debit: Decimal,
}

impl TradeDetector {
    pub fn new(client: BrokerClient, journal: Journal) -> Self {
        Self {
            client,
            journal,
            assumed_exit_debit: dec!(0.05),
        }
    }

    pub fn with_exit_debit(mut self, debit: Decimal) -> Self {
        self.assumed_exit_debit = debit;
        self
    }

    /// Record today's positions. Re-running on the same day overwrites.
    pub async fn take_snapshot(&self, account_number: &str) -> Result<Vec<SnapshotEntry>> {
        let positions = self.client.get_positions(account_number).await?;
        let entries: Vec<SnapshotEntry> =
            positions.iter().map(SnapshotEntry::from_position).collect();

        let today = Utc::now().date_naive();
        self.journal.append_snapshot(today, &entries).await?;

        info!(count = entries.len(), date = %today, "Position snapshot recorded");
        Ok(entries)
    }

    /// Snapshot, diff against the previous snapshot, and journal any
    /// detected option trades. With fewer than two snapshots on record
    /// this only bootstraps the history and reports no changes.
    pub async fn detect_changes(&self, account_number: &str) -> Result<PositionChanges> {
        self.take_snapshot(account_number).await?;

        let dates = self.journal.last_two_snapshot_dates().await?;
        if dates.len() < 2 {
            info!("First snapshot on record; nothing to compare yet");
            return Ok(PositionChanges::default());
        }

        let current = self.journal.snapshot_entries(dates[0]).await?;
        let previous = self.journal.snapshot_entries(dates[1]).await?;
        let changes = diff_snapshots(&current, &previous);

        if changes.is_empty() {
            debug!("No position changes since last snapshot");
            return Ok(changes);
        }

        self.journal_detected_trades(&changes, dates[0]).await?;
        Ok(changes)
    }

    /// Match detected option entries/exits to the journal.
    async fn journal_detected_trades(
        &self,
        changes: &PositionChanges,
        as_of: NaiveDate,
    ) -> Result<()> {
        // New option legs: claim a recent recommendation for the underlying
        let mut seen_underlyings = std::collections::HashSet::new();
        for entry in changes.entries.iter().filter(|e| e.is_option()) {
            let underlying = entry.underlying().to_string();
            if !seen_underlyings.insert(underlying.clone()) {
                continue; // Both legs of a spread map to one trade
            }

            match self
                .journal
                .find_recent_recommendation(&underlying, RECOMMENDATION_MATCH_DAYS)
                .await?
            {
                Some(rec) => {
                    let contracts = entry.quantity.abs().round();
                    let trade_id = self
                        .journal
                        .log_trade_from_recommendation(&rec, contracts, as_of)
                        .await?;
                    info!(
                        symbol = %underlying,
                        trade_id,
                        "Auto-logged trade entry from recommendation"
                    );
                }
                None => {
                    warn!(
                        symbol = %underlying,
                        "New option position with no matching recommendation; not journaled"
                    );
                }
            }
        }

        // Vanished option legs: close the matching open trade
        let mut closed_underlyings = std::collections::HashSet::new();
        for exit in changes.exits.iter().filter(|e| e.is_option()) {
            let underlying = exit.underlying().to_string();
            if !closed_underlyings.insert(underlying.clone()) {
                continue;
            }

            match self.journal.find_open_trade(&underlying).await? {
                Some(trade) => {
                    let outcome = self
                        .journal
                        .log_trade_exit(trade.id, self.assumed_exit_debit, as_of)
                        .await?;
                    info!(
                        symbol = %underlying,
                        trade_id = trade.id,
                        realized_pnl = %outcome.realized_pnl,
                        "Auto-logged trade exit"
                    );
                }
                None => {
                    debug!(symbol = %underlying, "Exited position had no open trade on record");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str, instrument_type: &str, quantity: Decimal) -> SnapshotEntry {
        SnapshotEntry {
            symbol: symbol.to_string(),
            instrument_type: instrument_type.to_string(),
            quantity,
            price: dec!(1.00),
        }
    }

    #[test]
    fn test_identical_snapshots_diff_empty() {
        let snapshot = vec![
            entry("AAPL", "Equity", dec!(100)),
            entry("AAPL  260220P00230000", "Equity Option", dec!(-2)),
        ];

        let changes = diff_snapshots(&snapshot, &snapshot);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_entries_exits_and_resizes() {
        let previous = vec![
            entry("AAPL  260220P00230000", "Equity Option", dec!(-2)),
            entry("MSFT  260220P00480000", "Equity Option", dec!(-3)),
            entry("SPY", "Equity", dec!(50)),
        ];
        let current = vec![
            entry("AAPL  260220P00230000", "Equity Option", dec!(-2)),
            entry("NVDA  260220P00170000", "Equity Option", dec!(-1)),
            entry("SPY", "Equity", dec!(75)),
        ];

        let changes = diff_snapshots(&current, &previous);

        assert_eq!(changes.entries.len(), 1);
        assert_eq!(changes.entries[0].underlying(), "NVDA");

        assert_eq!(changes.exits.len(), 1);
        assert_eq!(changes.exits[0].underlying(), "MSFT");

        assert_eq!(changes.quantity_changes.len(), 1);
        assert_eq!(changes.quantity_changes[0].symbol, "SPY");
        assert_eq!(changes.quantity_changes[0].previous, dec!(50));
        assert_eq!(changes.quantity_changes[0].current, dec!(75));
    }

    #[test]
    fn test_quantity_tolerance() {
        let previous = vec![entry("SPY", "Equity", dec!(50))];
        let current = vec![entry("SPY", "Equity", dec!(50.005))];

        let changes = diff_snapshots(&current, &previous);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_same_symbol_different_instrument_types() {
        // Shares and an option on the same underlying are distinct positions
        let previous = vec![entry("AAPL", "Equity", dec!(100))];
        let current = vec![
            entry("AAPL", "Equity", dec!(100)),
            entry("AAPL", "Equity Option", dec!(-1)),
        ];

        let changes = diff_snapshots(&current, &previous);
        assert_eq!(changes.entries.len(), 1);
        assert_eq!(changes.entries[0].instrument_type, "Equity Option");
        assert!(changes.exits.is_empty());
    }

    #[test]
    fn test_option_underlying_extraction() {
        let e = entry("SPY   260220P00565000", "Equity Option", dec!(-7));
        assert_eq!(e.underlying(), "SPY");
        assert!(e.is_option());

        let plain = entry("SPY", "Equity", dec!(10));
        assert_eq!(plain.underlying(), "SPY");
        assert!(!plain.is_option());
    }
}
