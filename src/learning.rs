//! Performance review over closed trades.
//!
//! Aggregates the journal's closed trades into a summary and turns the
//! summary into concrete scanner-parameter suggestions. Rules only fire
//! once there is a minimally meaningful sample.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use statrs::statistics::Statistics;

/// Trades required before any suggestion fires.
pub const MIN_SAMPLE_SIZE: usize = 10;

/// A closed trade as read back from the journal.
#[derive(Debug, Clone)]
pub struct ClosedTrade {
    pub symbol: String,
    pub strategy: String,
    pub iv_rank_at_entry: f64,
    pub credit: Decimal,
    pub contracts: i64,
    pub realized_pnl: Decimal,
    pub days_held: i64,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }
}

/// Aggregate performance over a set of closed trades.
#[derive(Debug, Clone, Default)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    /// Percentage of trades closed profitably
    pub win_rate: f64,
    pub total_pnl: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub avg_days_held: f64,
    pub winners_avg_iv_rank: f64,
    pub losers_avg_iv_rank: f64,
}

/// A proposed change to one scanner parameter.
#[derive(Debug, Clone)]
pub struct ParameterSuggestion {
    pub parameter: &'static str,
    pub current: f64,
    pub suggested: f64,
    pub rationale: String,
}

/// Summarize closed trades. An empty slice yields an all-zero summary.
pub fn summarize_outcomes(trades: &[ClosedTrade]) -> PerformanceSummary {
    if trades.is_empty() {
        return PerformanceSummary::default();
    }

    let (winners, losers): (Vec<&ClosedTrade>, Vec<&ClosedTrade>) =
        trades.iter().partition(|t| t.is_winner());

    let total_pnl: Decimal = trades.iter().map(|t| t.realized_pnl).sum();

    let avg_of = |group: &[&ClosedTrade]| -> Decimal {
        if group.is_empty() {
            Decimal::ZERO
        } else {
            group.iter().map(|t| t.realized_pnl).sum::<Decimal>()
                / Decimal::from(group.len() as u64)
        }
    };

    let iv_mean = |group: &[&ClosedTrade]| -> f64 {
        if group.is_empty() {
            0.0
        } else {
            group.iter().map(|t| t.iv_rank_at_entry).mean()
        }
    };

    PerformanceSummary {
        total_trades: trades.len(),
        winners: winners.len(),
        losers: losers.len(),
        win_rate: winners.len() as f64 / trades.len() as f64 * 100.0,
        total_pnl,
        avg_win: avg_of(&winners),
        avg_loss: avg_of(&losers),
        avg_days_held: trades.iter().map(|t| t.days_held as f64).mean(),
        winners_avg_iv_rank: iv_mean(&winners),
        losers_avg_iv_rank: iv_mean(&losers),
    }
}

/// Gross profit over gross loss. None when there are no losses yet.
pub fn profit_factor(trades: &[ClosedTrade]) -> Option<f64> {
    let gross_profit: Decimal = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.realized_pnl)
        .sum();
    let gross_loss: Decimal = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.realized_pnl.abs())
        .sum();

    if gross_loss == Decimal::ZERO {
        return None;
    }
    Some(gross_profit.to_f64().unwrap_or(0.0) / gross_loss.to_f64().unwrap_or(1.0))
}

/// Derive scanner-parameter suggestions from realized performance.
///
/// Below [`MIN_SAMPLE_SIZE`] trades this returns nothing, no matter how
/// lopsided the results look.
pub fn suggest_parameters(
    summary: &PerformanceSummary,
    current_min_iv_rank: f64,
) -> Vec<ParameterSuggestion> {
    let mut suggestions = Vec::new();

    if summary.total_trades < MIN_SAMPLE_SIZE {
        return suggestions;
    }

    if summary.win_rate < 50.0 {
        suggestions.push(ParameterSuggestion {
            parameter: "min_iv_rank",
            current: current_min_iv_rank,
            suggested: 60.0,
            rationale: format!(
                "Win rate {:.1}% is below 50%; be more selective about entries",
                summary.win_rate
            ),
        });
    } else if summary.win_rate > 70.0 {
        suggestions.push(ParameterSuggestion {
            parameter: "min_iv_rank",
            current: current_min_iv_rank,
            suggested: 40.0,
            rationale: format!(
                "Win rate {:.1}% leaves room to take more setups",
                summary.win_rate
            ),
        });
    }

    if summary.winners > 0
        && summary.losers > 0
        && summary.winners_avg_iv_rank - summary.losers_avg_iv_rank > 10.0
    {
        suggestions.push(ParameterSuggestion {
            parameter: "min_iv_rank",
            current: current_min_iv_rank,
            suggested: summary.winners_avg_iv_rank - 5.0,
            rationale: format!(
                "Winners entered at IV rank {:.1} on average vs {:.1} for losers",
                summary.winners_avg_iv_rank, summary.losers_avg_iv_rank
            ),
        });
    }

    suggestions
}
