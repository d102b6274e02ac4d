//! Earnings calendar, cached in the journal database.
//!
//! Dates come from a public quote-summary endpoint. Fetches are best
//! effort; a symbol whose earnings date cannot be determined is simply
//! treated as having none on record.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::journal::Journal;

const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";

/// Endpoint rejects requests without a browser-like user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

const FETCH_DELAY: Duration = Duration::from_millis(300);

/// An upcoming earnings announcement.
#[derive(Debug, Clone)]
pub struct EarningsEvent {
    pub symbol: String,
    pub earnings_date: NaiveDate,
    pub days_until: i64,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "calendarEvents")]
    calendar_events: Option<CalendarEvents>,
}

#[derive(Debug, Deserialize)]
struct CalendarEvents {
    earnings: Option<EarningsBlock>,
}

#[derive(Debug, Deserialize)]
struct EarningsBlock {
    #[serde(rename = "earningsDate", default)]
    earnings_date: Vec<EpochValue>,
}

#[derive(Debug, Deserialize)]
struct EpochValue {
    raw: Option<i64>,
}

/// Fetches and caches upcoming earnings dates.
#[derive(Clone)]
pub struct EarningsCalendar {
    http: reqwest::Client,
    journal: Journal,
}

impl EarningsCalendar {
    pub fn new(journal: Journal) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http, journal })
    }

    /// Next announced earnings date for a symbol, or None when the
    /// provider has nothing scheduled.
    pub async fn fetch_next_earnings(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        let url = format!("{}/{}", QUOTE_SUMMARY_URL, symbol);

        let response = self
            .http
            .get(&url)
            .query(&[("modules", "calendarEvents")])
            .send()
            .await
            .with_context(|| format!("Earnings request failed for {}", symbol))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Earnings request failed for {}: {}",
                symbol,
                response.status()
            );
        }

        let parsed: QuoteSummaryResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse earnings response for {}", symbol))?;

        let date = parsed
            .quote_summary
            .result
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| r.calendar_events)
            .filter_map(|c| c.earnings)
            .flat_map(|e| e.earnings_date)
            .filter_map(|v| v.raw)
            .filter_map(|epoch| DateTime::from_timestamp(epoch, 0))
            .map(|dt| dt.date_naive())
            .min();

        Ok(date)
    }

    /// Refresh cached earnings dates for the given symbols.
    pub async fn update_calendar(&self, symbols: &[&str]) -> Result<usize> {
        let mut updated = 0;

        for symbol in symbols {
            match self.fetch_next_earnings(symbol).await {
                Ok(Some(date)) => {
                    self.journal.upsert_earnings(symbol, date).await?;
                    debug!(symbol = %symbol, date = %date, "Cached earnings date");
                    updated += 1;
                }
                Ok(None) => {
                    debug!(symbol = %symbol, "No earnings date announced");
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Earnings fetch failed");
                }
            }
            tokio::time::sleep(FETCH_DELAY).await;
        }

        info!(updated, total = symbols.len(), "Earnings calendar refreshed");
        Ok(updated)
    }

    /// Check the cache for earnings within the next `days_ahead` days.
    pub async fn check_symbol_earnings(
        &self,
        symbol: &str,
        days_ahead: i64,
    ) -> Result<Option<EarningsEvent>> {
        let Some(date) = self.journal.earnings_date(symbol).await? else {
            return Ok(None);
        };

        let today = Utc::now().date_naive();
        let days_until = (date - today).num_days();

        if (0..=days_ahead).contains(&days_until) {
            return Ok(Some(EarningsEvent {
                symbol: symbol.to_string(),
                earnings_date: date,
                days_until,
            }));
        }

        Ok(None)
    }

    /// All cached earnings inside the window, soonest first.
    pub async fn upcoming(&self, days_ahead: i64) -> Result<Vec<EarningsEvent>> {
        let today = Utc::now().date_naive();
        let cutoff = today + chrono::Duration::days(days_ahead);

        let mut events: Vec<EarningsEvent> = self
            .journal
            .earnings_between(today, cutoff)
            .await?
            .into_iter()
            .map(|(symbol, date)| EarningsEvent {
                days_until: (date - today).num_days(),
                symbol,
                earnings_date: date,
            })
            .collect();

        events.sort_by_key(|e| e.earnings_date);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_summary_parsing() {
        let json = r#"{
            "quoteSummary": {
                "result": [{
                    "calendarEvents": {
                        "earnings": {
                            "earningsDate": [
                                {"raw": 1771372800, "fmt": "2026-02-18"},
                                {"raw": 1771632000, "fmt": "2026-02-21"}
                            ]
                        }
                    }
                }],
                "error": null
            }
        }"#;

        let parsed: QuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let dates: Vec<i64> = parsed
            .quote_summary
            .result
            .unwrap()
            .into_iter()
            .filter_map(|r| r.calendar_events)
            .filter_map(|c| c.earnings)
            .flat_map(|e| e.earnings_date)
            .filter_map(|v| v.raw)
            .collect();

        assert_eq!(dates, vec![1771372800, 1771632000]);
    }

    #[test]
    fn test_quote_summary_empty_result() {
        let json = r#"{"quoteSummary": {"result": null, "error": {"code": "Not Found"}}}"#;
        let parsed: QuoteSummaryResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.quote_summary.result.is_none());
    }
}
