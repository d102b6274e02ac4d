//! SQLite trade journal.
//!
//! Persists everything the assistant learns over time: recommendations,
//! executed trades and their outcomes, derived insights, performance
//! metric history, daily position snapshots, and cached earnings dates.
//! Dollar amounts are stored as REAL and converted to Decimal at the
//! boundary.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, Row, SqlitePool};
use tracing::{debug, info};

use crate::detector::SnapshotEntry;
use crate::learning::{ClosedTrade, PerformanceSummary};
use crate::models::CreditSpreadOpportunity;
use crate::sizing::PositionSizing;

const SCANNER_VERSION: &str = "v1.0";

/// A stored recommendation, as needed to journal a matching entry.
#[derive(Debug, Clone, FromRow)]
pub struct RecommendationRow {
    pub id: i64,
    pub symbol: String,
    pub strategy: String,
    pub expiration: NaiveDate,
    pub dte: i64,
    pub short_strike: f64,
    pub long_strike: f64,
    pub expected_credit: f64,
    pub iv_rank: f64,
}

/// An open trade, as needed to journal its exit.
#[derive(Debug, Clone, FromRow)]
pub struct OpenTradeRow {
    pub id: i64,
    pub symbol: String,
    pub date_entered: NaiveDate,
    pub actual_contracts: i64,
    pub entry_credit: f64,
    pub entry_iv_rank: f64,
}

/// What a closed trade realized.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub realized_pnl: Decimal,
    pub days_held: i64,
    pub max_profit_pct: f64,
}

/// A stored learning insight.
#[derive(Debug, Clone, FromRow)]
pub struct InsightRow {
    pub date_created: NaiveDate,
    pub insight_type: String,
    pub description: String,
}

#[derive(FromRow)]
struct ClosedTradeRow {
    symbol: String,
    strategy: String,
    entry_iv_rank: f64,
    entry_credit: f64,
    actual_contracts: i64,
    realized_pnl: f64,
    days_held: i64,
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or_default()
}

/// Handle to the journal database. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Journal {
    pool: SqlitePool,
}

impl Journal {
    /// Open (or create) the journal at the given sqlite URL and run
    /// migrations.
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to open journal database: {}", database_url))?;

        let journal = Self { pool };
        journal.migrate().await?;
        info!(url = %database_url, "Journal database ready");
        Ok(journal)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS recommendations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date_recommended TEXT NOT NULL,
                symbol TEXT NOT NULL,
                strategy TEXT NOT NULL,
                expiration TEXT NOT NULL,
                dte INTEGER NOT NULL,
                short_strike REAL NOT NULL,
                long_strike REAL NOT NULL,
                spread_width REAL NOT NULL,
                expected_credit REAL NOT NULL,
                expected_max_profit REAL NOT NULL,
                expected_max_loss REAL NOT NULL,
                expected_pop REAL NOT NULL,
                iv_rank REAL NOT NULL,
                recommended_contracts INTEGER NOT NULL,
                account_size REAL NOT NULL,
                reason TEXT NOT NULL,
                scanner_version TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'recommended'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recommendation_id INTEGER REFERENCES recommendations(id),
                date_entered TEXT NOT NULL,
                symbol TEXT NOT NULL,
                strategy TEXT NOT NULL,
                expiration TEXT NOT NULL,
                short_strike REAL NOT NULL,
                long_strike REAL NOT NULL,
                actual_contracts INTEGER NOT NULL,
                entry_credit REAL NOT NULL,
                entry_iv_rank REAL NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                date_closed TEXT,
                exit_debit REAL,
                realized_pnl REAL,
                days_held INTEGER,
                max_profit_pct REAL,
                close_reason TEXT,
                notes TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS insights (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date_created TEXT NOT NULL,
                insight_type TEXT NOT NULL,
                description TEXT NOT NULL,
                data TEXT,
                applied INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS performance_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date_calculated TEXT NOT NULL,
                total_trades INTEGER NOT NULL,
                winning_trades INTEGER NOT NULL,
                losing_trades INTEGER NOT NULL,
                win_rate REAL NOT NULL,
                avg_winner REAL NOT NULL,
                avg_loser REAL NOT NULL,
                profit_factor REAL,
                total_pnl REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS position_snapshots (
                snapshot_date TEXT NOT NULL,
                symbol TEXT NOT NULL,
                instrument_type TEXT NOT NULL,
                quantity REAL NOT NULL,
                price REAL NOT NULL,
                PRIMARY KEY (snapshot_date, symbol, instrument_type)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS earnings_calendar (
                symbol TEXT PRIMARY KEY,
                earnings_date TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trades_status ON trades(status, symbol)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_recommendations_lookup \
             ON recommendations(symbol, status, date_recommended)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Recommendations ====================

    /// Record a sized recommendation; returns its id.
    pub async fn log_recommendation(
        &self,
        opp: &CreditSpreadOpportunity,
        sizing: &PositionSizing,
        account_size: Decimal,
        reason: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO recommendations (
                date_recommended, symbol, strategy, expiration, dte,
                short_strike, long_strike, spread_width, expected_credit,
                expected_max_profit, expected_max_loss, expected_pop,
                iv_rank, recommended_contracts, account_size, reason,
                scanner_version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Utc::now().date_naive())
        .bind(&opp.symbol)
        .bind(opp.strategy.to_string())
        .bind(opp.expiration)
        .bind(opp.dte)
        .bind(to_f64(opp.short_strike))
        .bind(to_f64(opp.long_strike))
        .bind(to_f64(opp.width))
        .bind(to_f64(opp.credit))
        .bind(to_f64(opp.max_profit))
        .bind(to_f64(opp.max_loss))
        .bind(opp.pop)
        .bind(opp.iv_rank)
        .bind(sizing.contracts as i64)
        .bind(to_f64(account_size))
        .bind(reason)
        .bind(SCANNER_VERSION)
        .execute(&self.pool)
        .await?;

        let rec_id = result.last_insert_rowid();
        debug!(rec_id, symbol = %opp.symbol, "Recommendation logged");
        Ok(rec_id)
    }

    /// Most recent pending recommendation for a symbol within `days` days.
    pub async fn find_recent_recommendation(
        &self,
        symbol: &str,
        days: i64,
    ) -> Result<Option<RecommendationRow>> {
        let cutoff = Utc::now().date_naive() - chrono::Duration::days(days);

        let row = sqlx::query_as::<_, RecommendationRow>(
            r#"
            SELECT id, symbol, strategy, expiration, dte, short_strike,
                   long_strike, expected_credit, iv_rank
            FROM recommendations
            WHERE symbol = ? AND status = 'recommended' AND date_recommended >= ?
            ORDER BY date_recommended DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ==================== Trades ====================

    /// Journal an entry detected against a stored recommendation. Marks
    /// the recommendation executed in the same transaction.
    pub async fn log_trade_from_recommendation(
        &self,
        rec: &RecommendationRow,
        contracts: Decimal,
        entry_date: NaiveDate,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO trades (
                recommendation_id, date_entered, symbol, strategy, expiration,
                short_strike, long_strike, actual_contracts, entry_credit,
                entry_iv_rank, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rec.id)
        .bind(entry_date)
        .bind(&rec.symbol)
        .bind(&rec.strategy)
        .bind(rec.expiration)
        .bind(rec.short_strike)
        .bind(rec.long_strike)
        .bind(contracts.to_i64().unwrap_or(0))
        .bind(rec.expected_credit)
        .bind(rec.iv_rank)
        .bind("Auto-detected from position snapshot")
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE recommendations SET status = 'executed' WHERE id = ?")
            .bind(rec.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    /// Oldest open trade for a symbol.
    pub async fn find_open_trade(&self, symbol: &str) -> Result<Option<OpenTradeRow>> {
        let row = sqlx::query_as::<_, OpenTradeRow>(
            r#"
            SELECT id, symbol, date_entered, actual_contracts, entry_credit, entry_iv_rank
            FROM trades
            WHERE symbol = ? AND status = 'open'
            ORDER BY date_entered ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Close a trade, compute its outcome, and store any insights it
    /// generates.
    pub async fn log_trade_exit(
        &self,
        trade_id: i64,
        exit_debit: Decimal,
        close_date: NaiveDate,
    ) -> Result<TradeOutcome> {
        let trade = sqlx::query_as::<_, OpenTradeRow>(
            r#"
            SELECT id, symbol, date_entered, actual_contracts, entry_credit, entry_iv_rank
            FROM trades
            WHERE id = ?
            "#,
        )
        .bind(trade_id)
        .fetch_optional(&self.pool)
        .await?
        .with_context(|| format!("Trade #{} not found", trade_id))?;

        let entry_credit = to_decimal(trade.entry_credit);
        let realized_pnl =
            (entry_credit - exit_debit) * Decimal::from(100) * Decimal::from(trade.actual_contracts);
        let days_held = (close_date - trade.date_entered).num_days();
        let max_profit_pct = if trade.entry_credit > 0.0 {
            (trade.entry_credit - to_f64(exit_debit)) / trade.entry_credit * 100.0
        } else {
            0.0
        };

        sqlx::query(
            r#"
            UPDATE trades SET
                date_closed = ?,
                exit_debit = ?,
                realized_pnl = ?,
                days_held = ?,
                max_profit_pct = ?,
                close_reason = 'Position closed (auto-detected)',
                status = 'closed'
            WHERE id = ?
            "#,
        )
        .bind(close_date)
        .bind(to_f64(exit_debit))
        .bind(to_f64(realized_pnl))
        .bind(days_held)
        .bind(max_profit_pct)
        .bind(trade_id)
        .execute(&self.pool)
        .await?;

        let outcome = TradeOutcome {
            realized_pnl,
            days_held,
            max_profit_pct,
        };

        self.record_trade_insights(trade_id, &trade, &outcome).await?;
        Ok(outcome)
    }

    /// Derive and store insights from a closed trade's outcome.
    async fn record_trade_insights(
        &self,
        trade_id: i64,
        trade: &OpenTradeRow,
        outcome: &TradeOutcome,
    ) -> Result<()> {
        let mut insights: Vec<(&str, String, serde_json::Value)> = Vec::new();

        if outcome.realized_pnl > Decimal::ZERO {
            if outcome.max_profit_pct >= 50.0 {
                insights.push((
                    "winner",
                    format!(
                        "Followed 50% rule: closed at {:.1}% of max profit",
                        outcome.max_profit_pct
                    ),
                    serde_json::json!({"trade_id": trade_id, "close_pct": outcome.max_profit_pct}),
                ));
            }
            if trade.entry_iv_rank > 60.0 {
                insights.push((
                    "winner",
                    format!(
                        "High IV rank ({:.1}%) contributed to success",
                        trade.entry_iv_rank
                    ),
                    serde_json::json!({"trade_id": trade_id, "iv_rank": trade.entry_iv_rank}),
                ));
            }
        } else {
            if trade.entry_iv_rank < 40.0 {
                insights.push((
                    "loser",
                    format!(
                        "Low IV rank ({:.1}%) may have caused failure",
                        trade.entry_iv_rank
                    ),
                    serde_json::json!({"trade_id": trade_id, "iv_rank": trade.entry_iv_rank}),
                ));
            }
            if outcome.days_held < 7 {
                insights.push((
                    "loser",
                    format!(
                        "Held only {} days - may have exited too early",
                        outcome.days_held
                    ),
                    serde_json::json!({"trade_id": trade_id, "days_held": outcome.days_held}),
                ));
            }
        }

        let today = Utc::now().date_naive();
        for (insight_type, description, data) in insights {
            sqlx::query(
                "INSERT INTO insights (date_created, insight_type, description, data) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(today)
            .bind(insight_type)
            .bind(&description)
            .bind(data.to_string())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// All closed trades, oldest first.
    pub async fn get_closed_trades(&self) -> Result<Vec<ClosedTrade>> {
        let rows = sqlx::query_as::<_, ClosedTradeRow>(
            r#"
            SELECT symbol, strategy, entry_iv_rank, entry_credit,
                   actual_contracts, realized_pnl, days_held
            FROM trades
            WHERE status = 'closed'
            ORDER BY date_closed ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ClosedTrade {
                symbol: r.symbol,
                strategy: r.strategy,
                iv_rank_at_entry: r.entry_iv_rank,
                credit: to_decimal(r.entry_credit),
                contracts: r.actual_contracts,
                realized_pnl: to_decimal(r.realized_pnl),
                days_held: r.days_held,
            })
            .collect())
    }

    /// Count of trades still open.
    pub async fn open_trade_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM trades WHERE status = 'open'")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Most recent insights, newest first.
    pub async fn recent_insights(&self, limit: i64) -> Result<Vec<InsightRow>> {
        let rows = sqlx::query_as::<_, InsightRow>(
            r#"
            SELECT date_created, insight_type, description
            FROM insights
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ==================== Performance metrics ====================

    /// Append a performance snapshot to the metric history.
    pub async fn record_performance_metrics(
        &self,
        summary: &PerformanceSummary,
        profit_factor: Option<f64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO performance_metrics (
                date_calculated, total_trades, winning_trades, losing_trades,
                win_rate, avg_winner, avg_loser, profit_factor, total_pnl
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Utc::now().date_naive())
        .bind(summary.total_trades as i64)
        .bind(summary.winners as i64)
        .bind(summary.losers as i64)
        .bind(summary.win_rate)
        .bind(to_f64(summary.avg_win))
        .bind(to_f64(summary.avg_loss))
        .bind(profit_factor)
        .bind(to_f64(summary.total_pnl))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Position snapshots ====================

    /// Replace the snapshot for a date with the given entries.
    pub async fn append_snapshot(&self, date: NaiveDate, entries: &[SnapshotEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM position_snapshots WHERE snapshot_date = ?")
            .bind(date)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                "INSERT INTO position_snapshots \
                 (snapshot_date, symbol, instrument_type, quantity, price) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(date)
            .bind(&entry.symbol)
            .bind(&entry.instrument_type)
            .bind(to_f64(entry.quantity))
            .bind(to_f64(entry.price))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// The two most recent snapshot dates, newest first.
    pub async fn last_two_snapshot_dates(&self) -> Result<Vec<NaiveDate>> {
        let rows = sqlx::query(
            "SELECT DISTINCT snapshot_date FROM position_snapshots \
             ORDER BY snapshot_date DESC LIMIT 2",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.get("snapshot_date")).collect())
    }

    /// All entries recorded for a snapshot date.
    pub async fn snapshot_entries(&self, date: NaiveDate) -> Result<Vec<SnapshotEntry>> {
        let rows = sqlx::query(
            "SELECT symbol, instrument_type, quantity, price \
             FROM position_snapshots WHERE snapshot_date = ?",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| SnapshotEntry {
                symbol: r.get("symbol"),
                instrument_type: r.get("instrument_type"),
                quantity: to_decimal(r.get("quantity")),
                price: to_decimal(r.get("price")),
            })
            .collect())
    }

    // ==================== Earnings cache ====================

    /// Insert or update the cached earnings date for a symbol.
    pub async fn upsert_earnings(&self, symbol: &str, date: NaiveDate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO earnings_calendar (symbol, earnings_date, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(symbol) DO UPDATE SET
                earnings_date = excluded.earnings_date,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(symbol)
        .bind(date)
        .bind(Utc::now().date_naive())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Cached earnings date for a symbol, if any.
    pub async fn earnings_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        let row = sqlx::query("SELECT earnings_date FROM earnings_calendar WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("earnings_date")))
    }

    /// All cached earnings dates inside [start, end].
    pub async fn earnings_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(String, NaiveDate)>> {
        let rows = sqlx::query(
            "SELECT symbol, earnings_date FROM earnings_calendar \
             WHERE earnings_date >= ? AND earnings_date <= ? \
             ORDER BY earnings_date ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get("symbol"), r.get("earnings_date")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpreadKind;
    use rust_decimal_macros::dec;

    async fn test_journal() -> Journal {
        Journal::open("sqlite::memory:").await.unwrap()
    }

    fn sample_opportunity() -> CreditSpreadOpportunity {
        CreditSpreadOpportunity {
            symbol: "SPY".to_string(),
            strategy: SpreadKind::PutCredit,
            iv_rank: 68.5,
            expiration: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            dte: 45,
            short_strike: dec!(565),
            long_strike: dec!(555),
            width: dec!(10),
            credit: dec!(3.80),
            max_profit: dec!(380),
            max_loss: dec!(620),
            pop: 70.0,
            return_on_risk: dec!(38),
        }
    }

    fn sample_sizing() -> PositionSizing {
        PositionSizing {
            contracts: 3,
            max_loss_per_spread: dec!(620),
            total_credit: dec!(1140),
            total_max_loss: dec!(1860),
            risk_pct: dec!(4.04),
            meets_criteria: true,
        }
    }

    #[tokio::test]
    async fn test_recommendation_round_trip() {
        let journal = test_journal().await;

        let rec_id = journal
            .log_recommendation(
                &sample_opportunity(),
                &sample_sizing(),
                dec!(46000),
                "Scanner auto-generated",
            )
            .await
            .unwrap();
        assert!(rec_id > 0);

        let rec = journal
            .find_recent_recommendation("SPY", 7)
            .await
            .unwrap()
            .expect("recommendation should be found");
        assert_eq!(rec.id, rec_id);
        assert_eq!(rec.strategy, "Put Credit Spread");
        assert!((rec.expected_credit - 3.80).abs() < 1e-9);

        // Unknown symbol finds nothing
        assert!(journal
            .find_recent_recommendation("QQQ", 7)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_trade_lifecycle_and_insights() {
        let journal = test_journal().await;

        let rec_id = journal
            .log_recommendation(
                &sample_opportunity(),
                &sample_sizing(),
                dec!(46000),
                "test",
            )
            .await
            .unwrap();
        let rec = journal
            .find_recent_recommendation("SPY", 7)
            .await
            .unwrap()
            .unwrap();

        let entry_date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let trade_id = journal
            .log_trade_from_recommendation(&rec, dec!(3), entry_date)
            .await
            .unwrap();

        // Recommendation is now executed and no longer claimable
        assert!(journal
            .find_recent_recommendation("SPY", 7)
            .await
            .unwrap()
            .is_none());

        let open = journal.find_open_trade("SPY").await.unwrap().unwrap();
        assert_eq!(open.id, trade_id);
        assert_eq!(open.actual_contracts, 3);
        assert_eq!(journal.open_trade_count().await.unwrap(), 1);

        // Close at 0.05: pnl = (3.80 - 0.05) * 100 * 3 = 1125
        let close_date = NaiveDate::from_ymd_opt(2026, 1, 26).unwrap();
        let outcome = journal
            .log_trade_exit(trade_id, dec!(0.05), close_date)
            .await
            .unwrap();
        assert_eq!(outcome.realized_pnl, dec!(1125));
        assert_eq!(outcome.days_held, 21);
        assert!(outcome.max_profit_pct > 98.0);

        assert!(journal.find_open_trade("SPY").await.unwrap().is_none());

        // Winner at >50% of max with IV rank 68.5 yields two insights
        let insights = journal.recent_insights(10).await.unwrap();
        assert_eq!(insights.len(), 2);
        assert!(insights.iter().all(|i| i.insight_type == "winner"));

        let closed = journal.get_closed_trades().await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].contracts, 3);
        assert_eq!(closed[0].realized_pnl, dec!(1125));
    }

    #[tokio::test]
    async fn test_snapshot_storage() {
        let journal = test_journal().await;

        let day1 = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();

        let entries = vec![SnapshotEntry {
            symbol: "SPY   260220P00565000".to_string(),
            instrument_type: "Equity Option".to_string(),
            quantity: dec!(-3),
            price: dec!(1.20),
        }];

        journal.append_snapshot(day1, &entries).await.unwrap();
        journal.append_snapshot(day2, &entries).await.unwrap();
        // Same-day rerun replaces rather than duplicates
        journal.append_snapshot(day2, &entries).await.unwrap();

        let dates = journal.last_two_snapshot_dates().await.unwrap();
        assert_eq!(dates, vec![day2, day1]);

        let stored = journal.snapshot_entries(day2).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].quantity, dec!(-3));
        assert_eq!(stored[0].instrument_type, "Equity Option");
    }

    #[tokio::test]
    async fn test_earnings_cache() {
        let journal = test_journal().await;

        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        journal.upsert_earnings("AAPL", date).await.unwrap();
        journal
            .upsert_earnings("AAPL", date + chrono::Duration::days(1))
            .await
            .unwrap();

        let cached = journal.earnings_date("AAPL").await.unwrap().unwrap();
        assert_eq!(cached, date + chrono::Duration::days(1));

        let window = journal
            .earnings_between(date, date + chrono::Duration::days(7))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].0, "AAPL");
    }
}
