//! Built-in scan universe: liquid, optionable names grouped by sector.

pub const INDICES: &[&str] = &["SPY", "QQQ", "IWM", "DIA", "SPX"];

pub const TECHNOLOGY: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "NVDA", "TSLA", "AMD", "INTC", "CRM", "ORCL", "ADBE",
    "NFLX", "AVGO", "QCOM",
];

pub const FINANCIAL: &[&str] = &[
    "JPM", "BAC", "WFC", "GS", "MS", "C", "BLK", "AXP", "V", "MA", "PYPL",
];

pub const HEALTHCARE: &[&str] = &["UNH", "JNJ", "PFE", "ABBV", "TMO", "MRK", "LLY", "ABT"];

pub const CONSUMER: &[&str] = &[
    "WMT", "HD", "DIS", "NKE", "MCD", "SBUX", "TGT", "COST", "LOW",
];

pub const ENERGY: &[&str] = &["XOM", "CVX", "COP", "SLB", "OXY", "XLE"];

pub const COMMUNICATIONS: &[&str] = &["T", "VZ", "CMCSA", "TMUS"];

pub const INDUSTRIALS: &[&str] = &["BA", "CAT", "GE", "UPS", "FDX", "HON"];

pub const MEME_AND_TRADING: &[&str] = &[
    "GME", "AMC", "PLTR", "SOFI", "RIVN", "LCID", "F", "GM",
];

pub const COMMODITIES: &[&str] = &["GLD", "SLV", "USO", "FCX"];

/// Names that tend to carry rich premium.
pub const HIGH_VOLATILITY: &[&str] = &[
    "COIN", "SQ", "ROKU", "ZM", "SNAP", "UBER", "LYFT", "PINS",
];

pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("indices", INDICES),
    ("technology", TECHNOLOGY),
    ("financial", FINANCIAL),
    ("healthcare", HEALTHCARE),
    ("consumer", CONSUMER),
    ("energy", ENERGY),
    ("communications", COMMUNICATIONS),
    ("industrials", INDUSTRIALS),
    ("meme_and_trading", MEME_AND_TRADING),
    ("commodities", COMMODITIES),
    ("high_volatility", HIGH_VOLATILITY),
];

/// Every symbol across all categories, sorted and deduplicated.
pub fn full_watchlist() -> Vec<&'static str> {
    let mut symbols: Vec<&'static str> = CATEGORIES
        .iter()
        .flat_map(|(_, tickers)| tickers.iter().copied())
        .collect();
    symbols.sort_unstable();
    symbols.dedup();
    symbols
}

/// Symbols for one category, or None for an unknown category name.
pub fn by_category(category: &str) -> Option<&'static [&'static str]> {
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, tickers)| *tickers)
}

pub fn category_names() -> Vec<&'static str> {
    CATEGORIES.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_watchlist_sorted_unique() {
        let list = full_watchlist();
        assert!(list.len() > 70);
        assert!(list.windows(2).all(|w| w[0] < w[1]));
        assert!(list.contains(&"SPY"));
        assert!(list.contains(&"COIN"));
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(by_category("indices"), Some(INDICES));
        assert!(by_category("crypto").is_none());
        assert_eq!(category_names().len(), CATEGORIES.len());
    }
}
