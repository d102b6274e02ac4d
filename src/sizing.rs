//! Risk-based position sizing for credit spreads.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::CreditSpreadOpportunity;

/// Sizes positions from a fixed per-trade risk budget.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    account_size: Decimal,
    max_risk_per_trade: Decimal,
    max_risk_dollars: Decimal,
}

/// Full sizing for one opportunity, ready for the recommendation report.
#[derive(Debug, Clone)]
pub struct PositionSizing {
    pub contracts: u32,
    pub max_loss_per_spread: Decimal,
    pub total_credit: Decimal,
    pub total_max_loss: Decimal,
    /// Total max loss as a percentage of the account
    pub risk_pct: Decimal,
    pub meets_criteria: bool,
}

impl PositionSizer {
    /// `max_risk_per_trade` is a fraction, e.g. 0.05 for 5%.
    pub fn new(account_size: Decimal, max_risk_per_trade: Decimal) -> Self {
        Self {
            account_size,
            max_risk_per_trade,
            max_risk_dollars: account_size * max_risk_per_trade,
        }
    }

    pub fn account_size(&self) -> Decimal {
        self.account_size
    }

    pub fn max_risk_dollars(&self) -> Decimal {
        self.max_risk_dollars
    }

    /// Number of contracts the risk budget allows for a spread.
    ///
    /// Floors the budget division, then overrides a zero up to one contract
    /// when the spread still clears the credit floor. A degenerate spread
    /// (credit >= width) sizes to zero.
    pub fn size_credit_spread(&self, width: Decimal, credit: Decimal) -> u32 {
        let max_loss_per_spread = (width - credit) * dec!(100);
        if max_loss_per_spread <= Decimal::ZERO {
            return 0;
        }

        let contracts = (self.max_risk_dollars / max_loss_per_spread)
            .floor()
            .to_u32()
            .unwrap_or(0);

        if contracts == 0 && credit >= width / dec!(3) {
            return 1;
        }

        contracts
    }

    /// Size an opportunity and compute its aggregate dollar figures.
    pub fn calculate_position_details(&self, opp: &CreditSpreadOpportunity) -> PositionSizing {
        let contracts = self.size_credit_spread(opp.width, opp.credit);
        let max_loss_per_spread = (opp.width - opp.credit) * dec!(100);
        let total_credit = opp.credit * dec!(100) * Decimal::from(contracts);
        let total_max_loss = max_loss_per_spread * Decimal::from(contracts);

        let risk_pct = if self.account_size > Decimal::ZERO {
            total_max_loss / self.account_size * dec!(100)
        } else {
            Decimal::ZERO
        };

        PositionSizing {
            contracts,
            max_loss_per_spread,
            total_credit,
            total_max_loss,
            risk_pct,
            meets_criteria: contracts > 0 && total_max_loss <= self.max_risk_dollars,
        }
    }

    /// Render a recommendation card for the terminal.
    pub fn format_trade_recommendation(
        &self,
        opp: &CreditSpreadOpportunity,
        sizing: &PositionSizing,
    ) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "\n{} {} | IV Rank {:.1}\n",
            opp.symbol, opp.strategy, opp.iv_rank
        ));
        out.push_str(&format!(
            "  Expiration: {} ({} DTE)\n",
            opp.expiration, opp.dte
        ));
        out.push_str(&format!(
            "  Sell {} / Buy {} {} (${} wide)\n",
            opp.short_strike,
            opp.long_strike,
            opp.strategy.leg_type(),
            opp.width
        ));
        out.push_str(&format!(
            "  Credit: ${:.2} per spread | PoP ~{:.0}% | Return on risk {:.1}%\n",
            opp.credit, opp.pop, opp.return_on_risk
        ));
        out.push_str(&format!(
            "  Size: {} contract(s) | Total credit ${:.2} | Total max loss ${:.2} ({:.1}% of account)\n",
            sizing.contracts, sizing.total_credit, sizing.total_max_loss, sizing.risk_pct
        ));

        out.push_str("  Manage: close at 50% of max profit; stop out at 2x the credit\n");

        if !sizing.meets_criteria {
            out.push_str("  NOTE: does not fit the risk budget at any size\n");
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpreadKind;
    use chrono::NaiveDate;

    fn opportunity(width: Decimal, credit: Decimal) -> CreditSpreadOpportunity {
        CreditSpreadOpportunity {
            symbol: "XYZ".to_string(),
            strategy: SpreadKind::PutCredit,
            iv_rank: 65.0,
            expiration: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            dte: 45,
            short_strike: dec!(95),
            long_strike: dec!(95) - width,
            width,
            credit,
            max_profit: credit * dec!(100),
            max_loss: (width - credit) * dec!(100),
            pop: 70.0,
            return_on_risk: credit / width * dec!(100),
        }
    }

    #[test]
    fn test_sizing_on_46k_account() {
        // $46,000 at 5% risk = $2,300 budget. A 5-wide spread collecting
        // $1.85 risks $315 per contract: floor(2300 / 315) = 7.
        let sizer = PositionSizer::new(dec!(46000), dec!(0.05));
        let sizing = sizer.calculate_position_details(&opportunity(dec!(5), dec!(1.85)));

        assert_eq!(sizing.contracts, 7);
        assert_eq!(sizing.max_loss_per_spread, dec!(315));
        assert_eq!(sizing.total_credit, dec!(1295));
        assert_eq!(sizing.total_max_loss, dec!(2205));
        assert!(sizing.risk_pct > dec!(4.7) && sizing.risk_pct < dec!(4.9));
        assert!(sizing.meets_criteria);
    }

    #[test]
    fn test_floor_override_to_one_contract() {
        // $250 budget vs $315 per spread floors to 0, but the spread
        // clears the credit floor so one contract is allowed
        let sizer = PositionSizer::new(dec!(5000), dec!(0.05));
        assert_eq!(sizer.size_credit_spread(dec!(5), dec!(1.85)), 1);
    }

    #[test]
    fn test_no_override_below_credit_floor() {
        // Credit under width/3 never gets the one-contract override
        let sizer = PositionSizer::new(dec!(5000), dec!(0.05));
        assert_eq!(sizer.size_credit_spread(dec!(5), dec!(1.00)), 0);
    }

    #[test]
    fn test_degenerate_spread_sizes_to_zero() {
        let sizer = PositionSizer::new(dec!(46000), dec!(0.05));
        assert_eq!(sizer.size_credit_spread(dec!(5), dec!(5)), 0);
        assert_eq!(sizer.size_credit_spread(dec!(5), dec!(6)), 0);
    }

    #[test]
    fn test_meets_criteria_false_when_unsizable() {
        let sizer = PositionSizer::new(dec!(46000), dec!(0.05));
        let sizing = sizer.calculate_position_details(&opportunity(dec!(5), dec!(5)));
        assert_eq!(sizing.contracts, 0);
        assert!(!sizing.meets_criteria);
    }
}
