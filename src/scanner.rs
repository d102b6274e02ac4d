//! High-IV credit-spread scanner.
//!
//! Screens the watchlist by IV rank, optionally drops symbols with
//! imminent earnings, then walks option chains looking for defined-risk
//! credit spreads around the 0.30-delta short strike. "No opportunity"
//! is a normal outcome at every step, not an error.

use std::time::Duration;

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::api::BrokerClient;
use crate::earnings::{EarningsCalendar, EarningsEvent};
use crate::models::{
    ChainExpiration, CreditSpreadOpportunity, MarketCandidate, OptionQuote, SpreadKind,
};

/// Scanner tuning parameters.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Minimum IV rank for a symbol to be screened in
    pub min_iv_rank: f64,

    /// Preferred days to expiration
    pub target_dte: i64,

    /// Lower bound of the DTE window
    pub min_dte: i64,

    /// Upper bound of the DTE window
    pub max_dte: i64,

    /// Skip symbols with earnings inside the window
    pub avoid_earnings: bool,

    /// Days ahead to check for earnings
    pub earnings_window_days: i64,

    /// How many top candidates get their chains analyzed
    pub max_chain_analyses: usize,

    /// Courtesy pause between chain fetches
    pub chain_fetch_delay: Duration,

    /// IV rank above which the call side is also considered
    pub call_side_iv_rank: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            min_iv_rank: 50.0,
            target_dte: 45,
            min_dte: 30,
            max_dte: 60,
            avoid_earnings: true,
            earnings_window_days: 7,
            max_chain_analyses: 10,
            chain_fetch_delay: Duration::from_millis(500),
            call_side_iv_rank: 70.0,
        }
    }
}

/// Outcome of one scan cycle.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Candidates that passed the IV rank screen, sorted by IV rank descending
    pub candidates: Vec<MarketCandidate>,

    /// Symbols dropped for upcoming earnings
    pub earnings_excluded: Vec<EarningsEvent>,

    /// Spread opportunities, sorted by probability of profit descending
    pub opportunities: Vec<CreditSpreadOpportunity>,
}

/// Scanner for high-probability premium-selling setups.
pub struct Scanner {
    client: BrokerClient,
    earnings: Option<EarningsCalendar>,
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(
        client: BrokerClient,
        earnings: Option<EarningsCalendar>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            client,
            earnings,
            config,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Run one full scan cycle over the given symbols.
    pub async fn scan(&self, symbols: &[&str]) -> Result<ScanReport> {
        info!(
            symbols = symbols.len(),
            min_iv_rank = self.config.min_iv_rank,
            target_dte = self.config.target_dte,
            "Starting scan"
        );

        let metrics = self.client.get_market_metrics(symbols).await?;

        let mut candidates: Vec<MarketCandidate> = metrics
            .into_iter()
            .filter(|m| m.iv_rank >= self.config.min_iv_rank)
            .collect();

        info!(count = candidates.len(), "Symbols passed IV rank screen");

        let mut earnings_excluded = Vec::new();
        if self.config.avoid_earnings {
            if let Some(calendar) = &self.earnings {
                let mut kept = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    match calendar
                        .check_symbol_earnings(&candidate.symbol, self.config.earnings_window_days)
                        .await
                    {
                        Ok(Some(event)) => earnings_excluded.push(event),
                        Ok(None) => kept.push(candidate),
                        Err(e) => {
                            // Unknown earnings status is not a reason to drop a symbol
                            warn!(symbol = %candidate.symbol, error = %e, "Earnings check failed");
                            kept.push(candidate);
                        }
                    }
                }
                candidates = kept;
                info!(
                    count = candidates.len(),
                    excluded = earnings_excluded.len(),
                    "Symbols after earnings filter"
                );
            }
        }

        candidates.sort_by(|a, b| {
            b.iv_rank
                .partial_cmp(&a.iv_rank)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut opportunities = Vec::new();
        for candidate in candidates.iter().take(self.config.max_chain_analyses) {
            debug!(symbol = %candidate.symbol, iv_rank = candidate.iv_rank, "Analyzing chain");

            match self.client.get_option_chain(&candidate.symbol).await {
                Ok(chain) => {
                    opportunities.extend(self.analyze_chain(candidate, &chain.expirations));
                }
                Err(e) => {
                    // One bad symbol never aborts the scan
                    warn!(symbol = %candidate.symbol, error = %e, "Chain analysis failed, skipping");
                }
            }

            tokio::time::sleep(self.config.chain_fetch_delay).await;
        }

        opportunities.sort_by(|a, b| {
            b.pop
                .partial_cmp(&a.pop)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(ScanReport {
            candidates,
            earnings_excluded,
            opportunities,
        })
    }

    /// Analyze one symbol's chain for spread setups.
    fn analyze_chain(
        &self,
        candidate: &MarketCandidate,
        expirations: &[ChainExpiration],
    ) -> Vec<CreditSpreadOpportunity> {
        let mut found = Vec::new();

        let Some(expiration) =
            select_expiration(expirations, self.config.target_dte, self.config.min_dte, self.config.max_dte)
        else {
            debug!(
                symbol = %candidate.symbol,
                target_dte = self.config.target_dte,
                "No suitable expiration"
            );
            return found;
        };

        if let Some(spread) =
            find_put_credit_spread(&candidate.symbol, expiration, candidate.iv_rank)
        {
            found.push(spread);
        }

        // Call side only when premium is very rich
        if candidate.iv_rank > self.config.call_side_iv_rank {
            if let Some(spread) =
                find_call_credit_spread(&candidate.symbol, expiration, candidate.iv_rank)
            {
                found.push(spread);
            }
        }

        found
    }
}

/// Pick the expiration whose DTE is closest to `target_dte`, restricted to
/// the [min_dte, max_dte] window. Ties go to the first encountered.
pub fn select_expiration(
    expirations: &[ChainExpiration],
    target_dte: i64,
    min_dte: i64,
    max_dte: i64,
) -> Option<&ChainExpiration> {
    let mut best: Option<&ChainExpiration> = None;
    let mut best_diff = i64::MAX;

    for exp in expirations {
        if exp.dte < min_dte || exp.dte > max_dte {
            continue;
        }
        let diff = (exp.dte - target_dte).abs();
        if diff < best_diff {
            best_diff = diff;
            best = Some(exp);
        }
    }

    best
}

/// Delta band for the short leg: roughly 30% probability of expiring ITM.
const SHORT_DELTA_MIN: f64 = 0.25;
const SHORT_DELTA_MAX: f64 = 0.35;

/// Width policy: $5 spreads under $100 underlyings, $10 above.
fn width_for(short_strike: Decimal) -> Decimal {
    if short_strike < dec!(100) {
        dec!(5)
    } else {
        dec!(10)
    }
}

fn quote_qualifies(quote: &OptionQuote, delta_min: f64, delta_max: f64) -> bool {
    quote.delta >= delta_min && quote.delta <= delta_max && quote.has_market()
}

/// Find a put credit spread around the 0.30-delta short strike.
pub fn find_put_credit_spread(
    symbol: &str,
    expiration: &ChainExpiration,
    iv_rank: f64,
) -> Option<CreditSpreadOpportunity> {
    // Short put candidates: delta in [-0.35, -0.25] with a two-sided market
    let (short_strike, short_quote) = expiration
        .strikes
        .iter()
        .filter_map(|s| {
            let put = s.put.as_ref()?;
            quote_qualifies(put, -SHORT_DELTA_MAX, -SHORT_DELTA_MIN)
                .then_some((s.strike_price, put))
        })
        // Highest strike is closest to the money on the put side
        .max_by(|a, b| a.0.cmp(&b.0))?;

    let width = width_for(short_strike);
    let long_strike = short_strike - width;

    // The protective leg must exist at exactly that strike -- no interpolation
    let long_quote = expiration
        .strike_at(long_strike)?
        .put
        .as_ref()
        .filter(|q| q.has_market())?;

    build_spread(
        symbol,
        SpreadKind::PutCredit,
        expiration,
        iv_rank,
        short_strike,
        long_strike,
        width,
        short_quote,
        long_quote,
    )
}

/// Call-side counterpart: short the ~0.30-delta call, buy the wing above it.
pub fn find_call_credit_spread(
    symbol: &str,
    expiration: &ChainExpiration,
    iv_rank: f64,
) -> Option<CreditSpreadOpportunity> {
    let (short_strike, short_quote) = expiration
        .strikes
        .iter()
        .filter_map(|s| {
            let call = s.call.as_ref()?;
            quote_qualifies(call, SHORT_DELTA_MIN, SHORT_DELTA_MAX)
                .then_some((s.strike_price, call))
        })
        // Lowest strike is closest to the money on the call side
        .min_by(|a, b| a.0.cmp(&b.0))?;

    let width = width_for(short_strike);
    let long_strike = short_strike + width;

    let long_quote = expiration
        .strike_at(long_strike)?
        .call
        .as_ref()
        .filter(|q| q.has_market())?;

    build_spread(
        symbol,
        SpreadKind::CallCredit,
        expiration,
        iv_rank,
        short_strike,
        long_strike,
        width,
        short_quote,
        long_quote,
    )
}

#[allow(clippy::too_many_arguments)]
fn build_spread(
    symbol: &str,
    strategy: SpreadKind,
    expiration: &ChainExpiration,
    iv_rank: f64,
    short_strike: Decimal,
    long_strike: Decimal,
    width: Decimal,
    short_quote: &OptionQuote,
    long_quote: &OptionQuote,
) -> Option<CreditSpreadOpportunity> {
    let credit = short_quote.mid() - long_quote.mid();

    // Minimum risk/reward admission: credit must be at least a third of width
    if credit < width / dec!(3) {
        return None;
    }

    Some(CreditSpreadOpportunity {
        symbol: symbol.to_string(),
        strategy,
        iv_rank,
        expiration: expiration.expiration_date,
        dte: expiration.dte,
        short_strike,
        long_strike,
        width,
        credit,
        max_profit: credit * dec!(100),
        max_loss: (width - credit) * dec!(100),
        pop: short_quote.delta.abs() * 100.0,
        return_on_risk: credit / width * dec!(100),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChainStrike;
    use chrono::NaiveDate;

    fn expiration(dte: i64) -> ChainExpiration {
        ChainExpiration {
            expiration_date: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            dte,
            underlying_price: dec!(98.50),
            strikes: Vec::new(),
        }
    }

    fn put_strike(strike: Decimal, delta: f64, bid: Decimal, ask: Decimal) -> ChainStrike {
        ChainStrike {
            strike_price: strike,
            put: Some(OptionQuote { delta, bid, ask }),
            call: None,
        }
    }

    fn call_strike(strike: Decimal, delta: f64, bid: Decimal, ask: Decimal) -> ChainStrike {
        ChainStrike {
            strike_price: strike,
            put: None,
            call: Some(OptionQuote { delta, bid, ask }),
        }
    }

    #[test]
    fn test_select_expiration_closest_to_target() {
        let expirations = vec![expiration(31), expiration(44), expiration(58)];
        let chosen = select_expiration(&expirations, 45, 30, 60).unwrap();
        assert_eq!(chosen.dte, 44);
    }

    #[test]
    fn test_select_expiration_window_bounds() {
        // 29 is below the floor, 61 above the ceiling
        let expirations = vec![expiration(29), expiration(61)];
        assert!(select_expiration(&expirations, 45, 30, 60).is_none());

        let expirations = vec![expiration(30), expiration(60)];
        let chosen = select_expiration(&expirations, 45, 30, 60).unwrap();
        assert_eq!(chosen.dte, 30); // Equidistant; first encountered wins
    }

    #[test]
    fn test_put_credit_spread_found() {
        let mut exp = expiration(45);
        exp.strikes = vec![
            put_strike(dec!(97), -0.40, dec!(2.50), dec!(2.60)), // Delta too deep
            put_strike(dec!(95), -0.30, dec!(1.80), dec!(1.90)), // Short leg
            put_strike(dec!(93), -0.26, dec!(1.40), dec!(1.50)), // Qualifies, but lower strike
            put_strike(dec!(90), -0.18, dec!(0.10), dec!(0.20)), // Long leg
        ];

        let spread = find_put_credit_spread("XYZ", &exp, 65.0).unwrap();
        assert_eq!(spread.strategy, SpreadKind::PutCredit);
        assert_eq!(spread.short_strike, dec!(95));
        assert_eq!(spread.long_strike, dec!(90));
        assert_eq!(spread.width, dec!(5));
        // 1.85 - 0.15 = 1.70 credit
        assert_eq!(spread.credit, dec!(1.70));
        assert_eq!(spread.max_profit, dec!(170));
        assert_eq!(spread.max_loss, dec!(330));
        assert_eq!(spread.return_on_risk, dec!(34));
        assert!((spread.pop - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_put_spread_rejected_below_credit_floor() {
        // credit = 1.00 < width/3 = 1.67
        let mut exp = expiration(45);
        exp.strikes = vec![
            put_strike(dec!(95), -0.30, dec!(1.10), dec!(1.10)),
            put_strike(dec!(90), -0.18, dec!(0.10), dec!(0.10)),
        ];

        assert!(find_put_credit_spread("XYZ", &exp, 65.0).is_none());
    }

    #[test]
    fn test_put_spread_requires_exact_long_strike() {
        // No 90 strike in the chain: no interpolation, no spread
        let mut exp = expiration(45);
        exp.strikes = vec![
            put_strike(dec!(95), -0.30, dec!(1.80), dec!(1.90)),
            put_strike(dec!(92.5), -0.22, dec!(0.60), dec!(0.70)),
        ];

        assert!(find_put_credit_spread("XYZ", &exp, 65.0).is_none());
    }

    #[test]
    fn test_put_spread_requires_two_sided_market() {
        let mut exp = expiration(45);
        exp.strikes = vec![
            put_strike(dec!(95), -0.30, dec!(0), dec!(1.90)), // No bid
            put_strike(dec!(90), -0.18, dec!(0.10), dec!(0.20)),
        ];

        assert!(find_put_credit_spread("XYZ", &exp, 65.0).is_none());
    }

    #[test]
    fn test_no_strikes_in_delta_band() {
        let mut exp = expiration(45);
        exp.strikes = vec![
            put_strike(dec!(97), -0.45, dec!(3.00), dec!(3.10)),
            put_strike(dec!(85), -0.10, dec!(0.20), dec!(0.30)),
        ];

        assert!(find_put_credit_spread("XYZ", &exp, 65.0).is_none());
    }

    #[test]
    fn test_wide_spread_above_hundred() {
        let mut exp = expiration(45);
        exp.underlying_price = dec!(570);
        exp.strikes = vec![
            put_strike(dec!(565), -0.30, dec!(6.80), dec!(7.00)),
            put_strike(dec!(555), -0.20, dec!(3.00), dec!(3.20)),
        ];

        let spread = find_put_credit_spread("SPY", &exp, 68.0).unwrap();
        assert_eq!(spread.width, dec!(10));
        assert_eq!(spread.long_strike, dec!(555));
        // 6.90 - 3.10 = 3.80 >= 10/3
        assert_eq!(spread.credit, dec!(3.80));
    }

    #[test]
    fn test_call_credit_spread_shorts_lowest_qualifying_strike() {
        let mut exp = expiration(45);
        exp.strikes = vec![
            call_strike(dec!(102), 0.34, dec!(4.00), dec!(4.20)), // Short leg
            call_strike(dec!(105), 0.28, dec!(2.40), dec!(2.50)), // Qualifies, but further OTM
            call_strike(dec!(112), 0.12, dec!(0.55), dec!(0.65)), // Long leg at 102 + 10
        ];

        let spread = find_call_credit_spread("XYZ", &exp, 75.0).unwrap();
        assert_eq!(spread.strategy, SpreadKind::CallCredit);
        assert_eq!(spread.short_strike, dec!(102));
        assert_eq!(spread.long_strike, dec!(112));
        assert_eq!(spread.width, dec!(10));
        // 4.10 - 0.60 = 3.50 >= 10/3
        assert_eq!(spread.credit, dec!(3.50));
        assert!((spread.pop - 34.0).abs() < 1e-9);
    }
}
