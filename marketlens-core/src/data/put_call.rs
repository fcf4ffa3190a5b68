//! Put/call ratio provider (alphaquery option statistics).
//!
//! Series ids have the form `TICKER:WINDOW`, e.g. `SPY:10-Day`. The window
//! defaults to `30-Day` when omitted.

use super::http::{build_client, get_json, RetryPolicy};
use super::provider::{DataError, SeriesProvider};
use crate::calendar::parse_date;
use crate::domain::{DateRange, TimeSeries};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const PROVIDER: &str = "alphaquery";
const BASE_URL: &str = "https://www.alphaquery.com/data/option-statistic-chart";
const DEFAULT_WINDOW: &str = "30-Day";
const WINDOWS: &[&str] = &["10-Day", "20-Day", "30-Day", "60-Day", "90-Day", "120-Day", "150-Day", "180-Day"];

#[derive(Debug, Deserialize)]
struct Row {
    x: String,
    value: Option<f64>,
}

/// Parsed `TICKER:WINDOW` id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutCallId {
    pub ticker: String,
    pub window: String,
}

impl PutCallId {
    pub fn parse(id: &str) -> Result<Self, DataError> {
        let invalid = |reason: &str| DataError::InvalidSeriesId {
            id: id.to_string(),
            reason: reason.to_string(),
        };
        let (ticker, window) = match id.split_once(':') {
            Some((t, w)) => (t.trim(), w.trim()),
            None => (id.trim(), DEFAULT_WINDOW),
        };
        if ticker.is_empty() {
            return Err(invalid("empty ticker"));
        }
        if !WINDOWS.contains(&window) {
            return Err(invalid("unknown window"));
        }
        Ok(Self {
            ticker: ticker.to_uppercase(),
            window: window.to_string(),
        })
    }

    /// Alphaquery statistic name: volume-based put/call ratio for the window.
    fn identifier(&self) -> String {
        format!("iv-put-call-ratio-volume-{}", self.window.to_lowercase())
    }

    /// Query string for the chart endpoint; the range start bounds the download.
    fn query(&self, range: &DateRange) -> [(&'static str, String); 4] {
        [
            ("ticker", self.ticker.clone()),
            ("perType", self.window.clone()),
            ("identifier", self.identifier()),
            ("start", range.start().format("%Y-%m-%d").to_string()),
        ]
    }
}

pub struct PutCallProvider {
    client: Client,
    retry: RetryPolicy,
    base_url: String,
}

impl PutCallProvider {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            retry: RetryPolicy::default(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn parse_rows(rows: Vec<Row>) -> Result<TimeSeries, DataError> {
    let mut parsed = Vec::with_capacity(rows.len());
    for row in rows {
        let date = parse_date(&row.x)
            .ok_or_else(|| DataError::malformed(PROVIDER, format!("bad date '{}'", row.x)))?;
        parsed.push((date, row.value));
    }
    Ok(TimeSeries::from_sparse(parsed))
}

impl SeriesProvider for PutCallProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn fetch(&self, series_id: &str, range: &DateRange) -> Result<TimeSeries, DataError> {
        let query = PutCallId::parse(series_id)?.query(range);
        let rows: Vec<Row> = get_json(
            PROVIDER,
            || self.client.get(&self.base_url).query(&query).send(),
            None,
            self.retry,
        )?;
        Ok(parse_rows(rows)?.between(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_parsing() {
        assert_eq!(
            PutCallId::parse("spy:10-Day").unwrap(),
            PutCallId {
                ticker: "SPY".into(),
                window: "10-Day".into()
            }
        );
        assert_eq!(PutCallId::parse("QQQ").unwrap().window, "30-Day");
        assert!(PutCallId::parse(":10-Day").is_err());
        assert!(PutCallId::parse("SPY:7-Day").is_err());
    }

    #[test]
    fn identifier_names_the_window() {
        let id = PutCallId::parse("SPY:10-Day").unwrap();
        assert_eq!(id.identifier(), "iv-put-call-ratio-volume-10-day");
    }

    #[test]
    fn query_carries_range_start() {
        let id = PutCallId::parse("SPY:10-Day").unwrap();
        let start = parse_date("2023-03-28").unwrap();
        let range = DateRange::new(start, parse_date("2024-03-28").unwrap()).unwrap();
        let query = id.query(&range);
        assert_eq!(query[0], ("ticker", "SPY".to_string()));
        assert_eq!(query[1], ("perType", "10-Day".to_string()));
        assert_eq!(query[3], ("start", "2023-03-28".to_string()));
    }

    #[test]
    fn parses_rows_with_timestamps() {
        let rows: Vec<Row> = serde_json::from_str(
            r#"[{"x":"2024-03-01T00:00:00Z","value":0.91},
                {"x":"2024-03-04T00:00:00Z","value":null},
                {"x":"2024-03-05T00:00:00Z","value":1.12}]"#,
        )
        .unwrap();
        let s = parse_rows(rows).unwrap();
        assert_eq!(s.values(), vec![0.91, 0.91, 1.12]);
    }
}
