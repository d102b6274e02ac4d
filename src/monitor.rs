//! Position loss monitoring.
//!
//! Classifies every losing option position against the standard exit
//! discipline for premium sellers: close at 2x the credit received.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::models::{AccountPosition, LossWarning, Severity};

/// Loss thresholds for the severity waterfall.
#[derive(Debug, Clone)]
pub struct LossRules {
    /// A short position has hit max pain at this multiple of the credit
    pub loss_multiple: Decimal,

    /// A long position's tolerated loss, as a fraction of its cost basis
    pub long_loss_fraction: Decimal,
}

impl Default for LossRules {
    fn default() -> Self {
        Self {
            loss_multiple: dec!(2.0),
            long_loss_fraction: dec!(0.5),
        }
    }
}

/// One monitoring pass over an account's option positions.
#[derive(Debug, Default)]
pub struct LossReport {
    /// Losing positions at Watch severity or worse, worst first
    pub warnings: Vec<LossWarning>,

    /// Count of option positions that are flat or profitable
    pub healthy: usize,
}

impl LossReport {
    pub fn worst_severity(&self) -> Severity {
        self.warnings
            .iter()
            .map(|w| w.severity)
            .max()
            .unwrap_or(Severity::Ok)
    }
}

/// Unrealized P&L for an option position.
///
/// Short positions profit as the price falls below the entry credit; long
/// positions are marked against cost basis.
pub fn position_pnl(position: &AccountPosition) -> Decimal {
    let qty = position.quantity.abs();
    if position.is_short() {
        (position.average_open_price - position.close_price) * qty * position.multiplier
    } else {
        (position.close_price - position.average_open_price) * qty * position.multiplier
    }
}

/// Loss as a percentage of the reference amount for the position's side.
///
/// For shorts the reference is the credit received; a short that has lost
/// more than the credit reads below -100%. Returns zero when the basis is
/// zero, so a position with no recorded entry price never alerts.
pub fn loss_percentage(position: &AccountPosition, pnl: Decimal) -> Decimal {
    let basis = position.average_open_price * position.quantity.abs() * position.multiplier;
    if basis == Decimal::ZERO {
        return Decimal::ZERO;
    }
    pnl / basis * dec!(100)
}

/// Theoretical max loss for a losing short: the credit already received is
/// gone, plus the same amount again at the 2x stop.
fn short_max_loss(position: &AccountPosition, rules: &LossRules) -> Decimal {
    position.average_open_price * position.quantity.abs() * position.multiplier
        * rules.loss_multiple
}

/// Severity waterfall for a losing position. Checked top-down; the first
/// matching tier wins, so a position is never double-counted.
pub fn classify_severity(pnl: Decimal, max_loss: Decimal, loss_pct: Decimal) -> Severity {
    let loss = pnl.abs();

    if loss > max_loss.abs() || loss_pct < dec!(-100) {
        Severity::Critical
    } else if loss_pct < dec!(-50) || loss > max_loss.abs() * dec!(0.5) {
        Severity::Warning
    } else if loss_pct < dec!(-25) {
        Severity::Watch
    } else {
        Severity::Ok
    }
}

/// Scans option positions for losses past the exit thresholds.
#[derive(Debug, Default)]
pub struct LossMonitor {
    rules: LossRules,
}

impl LossMonitor {
    pub fn new(rules: LossRules) -> Self {
        Self { rules }
    }

    /// Classify every option position in the account.
    pub fn check_positions(&self, positions: &[AccountPosition]) -> LossReport {
        let mut report = LossReport::default();

        for position in positions {
            if !position.instrument_type.is_option() {
                continue;
            }

            let pnl = position_pnl(position);
            if pnl >= Decimal::ZERO {
                report.healthy += 1;
                continue;
            }

            let loss_pct = loss_percentage(position, pnl);
            let basis =
                position.average_open_price * position.quantity.abs() * position.multiplier;
            let max_loss = if position.is_short() {
                short_max_loss(position, &self.rules)
            } else {
                basis * self.rules.long_loss_fraction
            };

            let severity = classify_severity(pnl, max_loss, loss_pct);
            debug!(
                symbol = %position.symbol,
                pnl = %pnl,
                loss_pct = %loss_pct,
                severity = %severity,
                "Classified losing position"
            );

            if severity == Severity::Ok {
                report.healthy += 1;
                continue;
            }

            report.warnings.push(LossWarning {
                symbol: position.symbol.clone(),
                quantity: position.quantity,
                unrealized_pnl: pnl,
                loss_pct,
                severity,
                current_price: position.close_price,
                avg_price: position.average_open_price,
            });
        }

        report
            .warnings
            .sort_by(|a, b| b.severity.cmp(&a.severity).then(a.loss_pct.cmp(&b.loss_pct)));

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstrumentType;

    fn short_option(symbol: &str, entry: Decimal, current: Decimal, qty: Decimal) -> AccountPosition {
        AccountPosition {
            symbol: symbol.to_string(),
            instrument_type: InstrumentType::EquityOption,
            quantity: qty,
            average_open_price: entry,
            close_price: current,
            multiplier: dec!(100),
        }
    }

    #[test]
    fn test_short_past_double_credit_is_critical() {
        // Sold at 2.00, now 4.50: pnl = -250 on a 200 credit, loss -125%
        let position = short_option("XYZ 260220P00095000", dec!(2.00), dec!(4.50), dec!(-1));

        let pnl = position_pnl(&position);
        assert_eq!(pnl, dec!(-250));

        let loss_pct = loss_percentage(&position, pnl);
        assert_eq!(loss_pct, dec!(-125));

        let rules = LossRules::default();
        let max_loss = short_max_loss(&position, &rules);
        assert_eq!(max_loss, dec!(400));

        assert_eq!(classify_severity(pnl, max_loss, loss_pct), Severity::Critical);
    }

    #[test]
    fn test_waterfall_tiers_are_exclusive() {
        // Loss past half the max loss: Warning, not Critical
        assert_eq!(
            classify_severity(dec!(-250), dec!(400), dec!(-62.5)),
            Severity::Warning
        );

        // Between -25% and -50% with a small absolute loss: Watch
        assert_eq!(
            classify_severity(dec!(-120), dec!(400), dec!(-30)),
            Severity::Watch
        );

        // Shallow loss: Ok
        assert_eq!(classify_severity(dec!(-40), dec!(400), dec!(-10)), Severity::Ok);
    }

    #[test]
    fn test_zero_basis_never_alerts() {
        let position = short_option("XYZ", dec!(0), dec!(1.50), dec!(-1));
        let pnl = position_pnl(&position);
        assert_eq!(pnl, dec!(-150));
        assert_eq!(loss_percentage(&position, pnl), Decimal::ZERO);
    }

    #[test]
    fn test_monitor_skips_equities_and_winners() {
        let mut equity = short_option("AAPL", dec!(150), dec!(120), dec!(100));
        equity.instrument_type = InstrumentType::Equity;

        let winner = short_option("XYZ 260220P00095000", dec!(2.00), dec!(0.90), dec!(-7));
        let loser = short_option("ABC 260220P00050000", dec!(1.00), dec!(3.50), dec!(-2));

        let monitor = LossMonitor::default();
        let report = monitor.check_positions(&[equity, winner, loser]);

        assert_eq!(report.healthy, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].severity, Severity::Critical);
        assert_eq!(report.worst_severity(), Severity::Critical);
    }

    #[test]
    fn test_long_position_marked_against_basis() {
        // Bought at 3.00, now 1.20: pnl = -360 on a 600 basis, loss -60%.
        // A long's tolerated loss is half its basis, so this is Critical.
        let mut position = short_option("XYZ 260220C00105000", dec!(3.00), dec!(1.20), dec!(2));
        position.quantity = dec!(2);

        let pnl = position_pnl(&position);
        assert_eq!(pnl, dec!(-360));

        let loss_pct = loss_percentage(&position, pnl);
        assert_eq!(loss_pct, dec!(-60));

        let monitor = LossMonitor::default();
        let report = monitor.check_positions(std::slice::from_ref(&position));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].severity, Severity::Critical);

        // A shallow long loss stays healthy
        position.close_price = dec!(2.40);
        let report = monitor.check_positions(std::slice::from_ref(&position));
        assert!(report.warnings.is_empty());
        assert_eq!(report.healthy, 1);
    }
}
