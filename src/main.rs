mod api;
mod config;
mod detector;
mod earnings;
mod journal;
mod learning;
mod models;
mod monitor;
mod scanner;
mod sizing;
mod watchlist;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use crate::api::BrokerClient;
use crate::config::ApiConfig;
use crate::detector::TradeDetector;
use crate::earnings::EarningsCalendar;
use crate::journal::Journal;
use crate::learning::{profit_factor, suggest_parameters, summarize_outcomes};
use crate::monitor::{LossMonitor, LossRules};
use crate::scanner::{Scanner, ScannerConfig};
use crate::sizing::PositionSizer;

#[derive(Parser)]
#[command(name = "thetadesk", version, about = "Options premium-selling assistant")]
struct Cli {
    /// Journal database URL
    #[arg(
        long,
        global = true,
        env = "THETADESK_DATABASE",
        default_value = "sqlite:./thetadesk.db?mode=rwc"
    )]
    database: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the watchlist for high-IV credit spread setups
    Scan {
        /// Minimum IV rank to consider a symbol
        #[arg(long, default_value_t = 50.0)]
        min_iv_rank: f64,

        /// How many top candidates get full chain analysis
        #[arg(long, default_value_t = 10)]
        max_symbols: usize,

        /// Restrict the scan to one watchlist category
        #[arg(long)]
        category: Option<String>,

        /// Scan symbols even when earnings are imminent
        #[arg(long)]
        include_earnings: bool,
    },

    /// Scan, size, and journal trade recommendations
    Recommend {
        /// Account size in dollars
        #[arg(long, default_value = "46000")]
        account_size: Decimal,

        /// Max risk per trade as a fraction of the account
        #[arg(long, default_value = "0.05")]
        max_risk: Decimal,

        /// Minimum IV rank (looser than plain scan to surface more setups)
        #[arg(long, default_value_t = 30.0)]
        min_iv_rank: f64,

        #[arg(long, default_value_t = 10)]
        max_symbols: usize,

        /// How many recommendations to keep
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// Check open option positions against loss thresholds
    Monitor {
        #[arg(long)]
        account: Option<String>,
    },

    /// Record today's position snapshot
    Snapshot {
        #[arg(long)]
        account: Option<String>,
    },

    /// Snapshot, then detect and journal position changes
    Detect {
        #[arg(long)]
        account: Option<String>,
    },

    /// Show balances, positions, and live orders
    Portfolio {
        #[arg(long)]
        account: Option<String>,
    },

    /// Show or refresh upcoming earnings dates
    Earnings {
        /// Days ahead to report
        #[arg(long, default_value_t = 14)]
        days: i64,

        /// Refresh the cache from the provider first
        #[arg(long)]
        refresh: bool,
    },

    /// Summarize closed-trade performance
    Performance,

    /// Review results and suggest scanner parameter changes
    Learn,

    /// Run the full daily routine: detect, review, recommend
    Daily {
        #[arg(long)]
        account: Option<String>,

        #[arg(long, default_value = "46000")]
        account_size: Decimal,

        #[arg(long, default_value = "0.05")]
        max_risk: Decimal,
    },

    /// Print the scan universe
    Watchlist {
        #[arg(long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let journal = Journal::open(&cli.database).await?;

    match cli.command {
        Command::Scan {
            min_iv_rank,
            max_symbols,
            category,
            include_earnings,
        } => {
            let symbols = resolve_symbols(category.as_deref())?;
            let config = ScannerConfig {
                min_iv_rank,
                max_chain_analyses: max_symbols,
                avoid_earnings: !include_earnings,
                ..ScannerConfig::default()
            };
            run_scan(&journal, &symbols, config).await?;
        }
        Command::Recommend {
            account_size,
            max_risk,
            min_iv_rank,
            max_symbols,
            top,
        } => {
            run_recommend(&journal, account_size, max_risk, min_iv_rank, max_symbols, top).await?;
        }
        Command::Monitor { account } => {
            run_monitor(account.as_deref()).await?;
        }
        Command::Snapshot { account } => {
            let client = broker_client()?;
            let account = resolve_account(&client, account.as_deref()).await?;
            let detector = TradeDetector::new(client, journal);
            let entries = detector.take_snapshot(&account).await?;
            println!("Recorded snapshot of {} position(s).", entries.len());
        }
        Command::Detect { account } => {
            run_detect(&journal, account.as_deref()).await?;
        }
        Command::Portfolio { account } => {
            run_portfolio(account.as_deref()).await?;
        }
        Command::Earnings { days, refresh } => {
            run_earnings(&journal, days, refresh).await?;
        }
        Command::Performance => {
            run_performance(&journal).await?;
        }
        Command::Learn => {
            run_learn(&journal).await?;
        }
        Command::Daily {
            account,
            account_size,
            max_risk,
        } => {
            run_daily(&journal, account.as_deref(), account_size, max_risk).await?;
        }
        Command::Watchlist { category } => {
            print_watchlist(category.as_deref())?;
        }
    }

    Ok(())
}

fn broker_client() -> Result<BrokerClient> {
    BrokerClient::new(ApiConfig::from_env()?)
}

/// Use the given account or fall back to the first on the customer.
async fn resolve_account(client: &BrokerClient, account: Option<&str>) -> Result<String> {
    if let Some(account) = account {
        return Ok(account.to_string());
    }

    let accounts = client.get_account_numbers().await?;
    accounts
        .into_iter()
        .next()
        .context("No accounts found for this login")
}

fn resolve_symbols(category: Option<&str>) -> Result<Vec<&'static str>> {
    match category {
        None => Ok(watchlist::full_watchlist()),
        Some(name) => watchlist::by_category(name)
            .map(|s| s.to_vec())
            .with_context(|| {
                format!(
                    "Unknown category '{}'. Available: {}",
                    name,
                    watchlist::category_names().join(", ")
                )
            }),
    }
}

fn build_scanner(journal: &Journal, config: ScannerConfig) -> Result<Scanner> {
    let client = broker_client()?;
    let calendar = EarningsCalendar::new(journal.clone())?;
    Ok(Scanner::new(client, Some(calendar), config))
}

async fn run_scan(journal: &Journal, symbols: &[&str], config: ScannerConfig) -> Result<()> {
    let scanner = build_scanner(journal, config)?;
    let report = scanner.scan(symbols).await?;

    println!("\n=== SCAN RESULTS ===\n");
    println!(
        "{} candidate(s) passed the IV rank screen, {} excluded for earnings.",
        report.candidates.len(),
        report.earnings_excluded.len()
    );

    for event in &report.earnings_excluded {
        println!(
            "  skipped {} (earnings {} in {} day(s))",
            event.symbol, event.earnings_date, event.days_until
        );
    }

    if report.opportunities.is_empty() {
        println!("\nNo spreads met the criteria today.");
        print_tuning_hints(scanner.config());
        return Ok(());
    }

    println!("\n{} opportunity(ies), best probability first:\n", report.opportunities.len());
    for opp in &report.opportunities {
        println!(
            "{:<6} {} | {} ({} DTE) | sell {} / buy {} | credit ${:.2} | PoP ~{:.0}% | RoR {:.1}% | IVR {:.1}",
            opp.symbol,
            opp.strategy,
            opp.expiration,
            opp.dte,
            opp.short_strike,
            opp.long_strike,
            opp.credit,
            opp.pop,
            opp.return_on_risk,
            opp.iv_rank
        );
    }

    Ok(())
}

fn print_tuning_hints(config: &ScannerConfig) {
    println!("Things to try:");
    if config.min_iv_rank > 30.0 {
        println!("  - lower --min-iv-rank (currently {:.0})", config.min_iv_rank);
    }
    if config.avoid_earnings {
        println!("  - pass --include-earnings to scan through earnings week");
    }
    println!("  - raise --max-symbols to analyze more chains");
}

async fn run_recommend(
    journal: &Journal,
    account_size: Decimal,
    max_risk: Decimal,
    min_iv_rank: f64,
    max_symbols: usize,
    top: usize,
) -> Result<()> {
    let config = ScannerConfig {
        min_iv_rank,
        max_chain_analyses: max_symbols,
        ..ScannerConfig::default()
    };
    let scanner = build_scanner(journal, config)?;
    let sizer = PositionSizer::new(account_size, max_risk);

    let symbols = watchlist::full_watchlist();
    let report = scanner.scan(&symbols).await?;

    println!("\n=== TRADE RECOMMENDATIONS ===");
    println!(
        "Account ${} | max risk per trade ${} ({:.1}%)\n",
        account_size,
        sizer.max_risk_dollars(),
        max_risk * dec!(100)
    );

    if report.opportunities.is_empty() {
        println!("No spreads met the criteria today.");
        print_tuning_hints(scanner.config());
        return Ok(());
    }

    let mut logged = 0;
    for opp in report.opportunities.iter().take(top) {
        let sizing = sizer.calculate_position_details(opp);
        print!("{}", sizer.format_trade_recommendation(opp, &sizing));

        if sizing.meets_criteria {
            let rec_id = journal
                .log_recommendation(opp, &sizing, account_size, "Scanner auto-generated")
                .await?;
            info!(rec_id, symbol = %opp.symbol, "Recommendation journaled");
            logged += 1;
        }
    }

    println!("\n{} recommendation(s) journaled.", logged);
    Ok(())
}

async fn run_monitor(account: Option<&str>) -> Result<()> {
    let client = broker_client()?;
    let account = resolve_account(&client, account).await?;
    let positions = client.get_positions(&account).await?;

    let monitor = LossMonitor::new(LossRules::default());
    let report = monitor.check_positions(&positions);

    println!("\n=== POSITION LOSS CHECK ===\n");
    println!(
        "{} healthy option position(s), {} needing attention.",
        report.healthy,
        report.warnings.len()
    );

    for warning in &report.warnings {
        println!(
            "\n[{}] {} x{}",
            warning.severity, warning.symbol, warning.quantity
        );
        println!(
            "  entry {:.2} -> now {:.2} | unrealized ${:.2} ({:.1}%)",
            warning.avg_price, warning.current_price, warning.unrealized_pnl, warning.loss_pct
        );
        println!("  {}", warning.action());
    }

    Ok(())
}

async fn run_detect(journal: &Journal, account: Option<&str>) -> Result<()> {
    let client = broker_client()?;
    let account = resolve_account(&client, account).await?;
    let detector = TradeDetector::new(client, journal.clone());

    let changes = detector.detect_changes(&account).await?;

    println!("\n=== POSITION CHANGES ===\n");
    if changes.is_empty() {
        println!("No changes since the previous snapshot.");
        return Ok(());
    }

    for entry in &changes.entries {
        println!("NEW    {} ({}) x{}", entry.symbol, entry.instrument_type, entry.quantity);
    }
    for exit in &changes.exits {
        println!("CLOSED {} ({}) x{}", exit.symbol, exit.instrument_type, exit.quantity);
    }
    for change in &changes.quantity_changes {
        println!(
            "RESIZE {} ({}) {} -> {}",
            change.symbol, change.instrument_type, change.previous, change.current
        );
    }

    Ok(())
}

async fn run_portfolio(account: Option<&str>) -> Result<()> {
    let client = broker_client()?;
    let account = resolve_account(&client, account).await?;

    let balances = client.get_balances(&account).await?;
    let positions = client.get_positions(&account).await?;
    let orders = client.get_live_orders(&account).await?;

    println!("\n=== PORTFOLIO ({}) ===\n", account);

    let show = |label: &str, value: Option<Decimal>| match value {
        Some(v) => println!("{:<24} ${:.2}", label, v),
        None => println!("{:<24} n/a", label),
    };
    show("Net liquidating value", balances.net_liquidating_value);
    show("Cash balance", balances.cash_balance);
    show("Equity buying power", balances.equity_buying_power);
    show("Derivative buying power", balances.derivative_buying_power);
    show("Maintenance requirement", balances.maintenance_requirement);

    let (options, equities): (Vec<_>, Vec<_>) = positions
        .iter()
        .partition(|p| p.instrument_type.is_option());

    let print_group = |label: &str, group: &[&models::AccountPosition]| {
        if group.is_empty() {
            return;
        }
        println!("\n{} ({}):", label, group.len());
        for position in group {
            println!(
                "  {:<24} x{:<8} avg {:.2} now {:.2} value ${:.2}",
                position.symbol,
                position.quantity,
                position.average_open_price,
                position.close_price,
                position.market_value()
            );
        }
    };
    print_group("Options", &options);
    print_group("Equities and other", &equities);

    println!("\n{} live order(s):", orders.len());
    for order in &orders {
        println!(
            "  {} {} with {} leg(s)",
            order.order_type.as_deref().unwrap_or("?"),
            order.status.as_deref().unwrap_or("?"),
            order.legs.len()
        );
    }

    Ok(())
}

async fn run_earnings(journal: &Journal, days: i64, refresh: bool) -> Result<()> {
    let calendar = EarningsCalendar::new(journal.clone())?;

    if refresh {
        let symbols = watchlist::full_watchlist();
        println!("Refreshing earnings dates for {} symbols...", symbols.len());
        calendar.update_calendar(&symbols).await?;
    }

    let events = calendar.upcoming(days).await?;

    println!("\n=== EARNINGS IN THE NEXT {} DAYS ===\n", days);
    if events.is_empty() {
        println!("Nothing on the cached calendar. Run with --refresh to update it.");
        return Ok(());
    }

    for event in &events {
        println!(
            "{:<6} {} ({} day(s))",
            event.symbol, event.earnings_date, event.days_until
        );
    }

    Ok(())
}

async fn run_performance(journal: &Journal) -> Result<()> {
    let trades = journal.get_closed_trades().await?;

    println!("\n=== TRADE PERFORMANCE SUMMARY ===\n");
    if trades.is_empty() {
        println!("No closed trades yet.");
        return Ok(());
    }

    let summary = summarize_outcomes(&trades);
    let pf = profit_factor(&trades);

    println!("Total trades:  {}", summary.total_trades);
    println!(
        "Winners:       {} ({:.1}%)",
        summary.winners, summary.win_rate
    );
    println!("Losers:        {}", summary.losers);
    println!("Avg winner:    ${:.2}", summary.avg_win);
    println!("Avg loser:     ${:.2}", summary.avg_loss);
    println!("Total P&L:     ${:.2}", summary.total_pnl);
    match pf {
        Some(pf) => println!("Profit factor: {:.2}", pf),
        None => println!("Profit factor: n/a (no losses yet)"),
    }
    println!("Avg days held: {:.1}", summary.avg_days_held);

    let mut by_strategy: std::collections::BTreeMap<&str, (usize, Decimal)> =
        std::collections::BTreeMap::new();
    for trade in &trades {
        let entry = by_strategy.entry(trade.strategy.as_str()).or_default();
        entry.0 += 1;
        entry.1 += trade.realized_pnl;
    }
    println!("\nBy strategy:");
    for (strategy, (count, pnl)) in &by_strategy {
        println!("  {:<22} {} trade(s), ${:.2}", strategy, count, pnl);
    }

    journal.record_performance_metrics(&summary, pf).await?;

    Ok(())
}

async fn run_learn(journal: &Journal) -> Result<()> {
    let trades = journal.get_closed_trades().await?;
    let summary = summarize_outcomes(&trades);

    println!("\n=== LEARNING REVIEW ===\n");
    println!("{} closed trade(s) on record.", summary.total_trades);

    let defaults = ScannerConfig::default();
    let suggestions = suggest_parameters(&summary, defaults.min_iv_rank);

    if suggestions.is_empty() {
        if summary.total_trades < learning::MIN_SAMPLE_SIZE {
            println!(
                "Need at least {} closed trades before suggesting changes.",
                learning::MIN_SAMPLE_SIZE
            );
        } else {
            println!("Current parameters look fine; no changes suggested.");
        }
    } else {
        for suggestion in &suggestions {
            println!(
                "\n{}: {:.1} -> {:.1}",
                suggestion.parameter, suggestion.current, suggestion.suggested
            );
            println!("  {}", suggestion.rationale);
        }
    }

    let insights = journal.recent_insights(5).await?;
    if !insights.is_empty() {
        println!("\nRecent insights:");
        for insight in &insights {
            println!("  [{}] {} - {}", insight.insight_type, insight.date_created, insight.description);
        }
    }

    Ok(())
}

/// Detect changes, review performance, then produce fresh recommendations.
async fn run_daily(
    journal: &Journal,
    account: Option<&str>,
    account_size: Decimal,
    max_risk: Decimal,
) -> Result<()> {
    println!("=== DAILY ROUTINE ===");

    match run_detect(journal, account).await {
        Ok(()) => {}
        Err(e) => warn!(error = %e, "Trade detection failed; continuing"),
    }

    let trades = journal.get_closed_trades().await?;
    if trades.len() >= 5 {
        run_performance(journal).await?;
        run_learn(journal).await?;
    } else {
        println!(
            "\nOnly {} closed trade(s); skipping performance review.",
            trades.len()
        );
    }

    tokio::time::sleep(Duration::from_millis(250)).await;

    run_recommend(journal, account_size, max_risk, 30.0, 10, 5).await
}

fn print_watchlist(category: Option<&str>) -> Result<()> {
    match category {
        Some(name) => {
            let symbols = resolve_symbols(Some(name))?;
            println!("{}: {}", name, symbols.join(", "));
        }
        None => {
            for (name, symbols) in watchlist::CATEGORIES {
                println!("{:<18} {} symbol(s)", name, symbols.len());
            }
            let all = watchlist::full_watchlist();
            println!("\n{} unique symbols total:\n{}", all.len(), all.join(", "));
        }
    }
    Ok(())
}
