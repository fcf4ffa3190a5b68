//! Yahoo Finance market-data provider.
//!
//! Reads daily history and latest quotes from Yahoo's v8 chart API. Handles
//! rate limiting, retries with exponential backoff, response parsing, and the
//! circuit breaker.
//!
//! Yahoo has no official API and is subject to unannounced format changes;
//! anything that does not decode is reported as a malformed payload.

use super::circuit_breaker::CircuitBreaker;
use super::http::{build_client, get_json, RetryPolicy};
use super::provider::{DataError, MarketDataProvider, PriceHistory, Quote};
use crate::calendar::date_from_epoch_secs;
use crate::domain::{DateRange, TimeSeries};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "yahoo_finance";
const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i32,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance provider.
pub struct YahooProvider {
    client: Client,
    circuit_breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    base_url: String,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, timeout: Duration) -> Result<Self, DataError> {
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            circuit_breaker,
            retry: RetryPolicy::default(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point at a different host (proxies, recorded fixtures).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn history_url(&self, symbol: &str, range: &DateRange) -> String {
        let start_ts = epoch_start(range.start());
        let end_ts = epoch_start(range.end()) + 86_399;
        format!(
            "{}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d&includeAdjustedClose=true",
            self.base_url
        )
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!("{}/{symbol}?range=5d&interval=1d", self.base_url)
    }

    fn get_chart(&self, symbol: &str, url: &str) -> Result<ChartData, DataError> {
        let resp: ChartResponse = get_json(
            PROVIDER,
            || self.client.get(url).send(),
            Some(&self.circuit_breaker),
            self.retry,
        )?;
        first_result(symbol, resp)
    }
}

fn epoch_start(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn first_result(symbol: &str, resp: ChartResponse) -> Result<ChartData, DataError> {
    let results = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::malformed(PROVIDER, format!("{}: {}", err.code, err.description)),
        None => DataError::malformed(PROVIDER, "empty result with no error"),
    })?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| DataError::malformed(PROVIDER, "result array is empty"))
}

/// Chart payload → adjusted close and volume series on exchange-local dates.
///
/// Adjusted close is preferred; raw close fills in where it is absent.
/// Interior gaps are forward-filled; no timestamps → empty history.
fn parse_history(data: ChartData) -> Result<PriceHistory, DataError> {
    let Some(timestamps) = data.timestamp else {
        return Ok(PriceHistory::default());
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::malformed(PROVIDER, "no quote data"))?;
    let adj = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let gmtoffset = data.meta.gmtoffset;
    let mut closes = Vec::with_capacity(timestamps.len());
    let mut volumes = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = date_from_epoch_secs(ts, gmtoffset)
            .ok_or_else(|| DataError::malformed(PROVIDER, format!("invalid timestamp: {ts}")))?;
        let close = adj
            .as_ref()
            .and_then(|v| v.get(i).copied().flatten())
            .or_else(|| quote.close.get(i).copied().flatten());
        closes.push((date, close));
        volumes.push((date, quote.volume.get(i).copied().flatten()));
    }

    Ok(PriceHistory {
        close: TimeSeries::from_sparse(closes),
        volume: TimeSeries::from_sparse(volumes),
    })
}

/// Latest price and previous close from chart metadata, falling back to the
/// last two closes in the payload.
fn parse_quote(symbol: &str, data: ChartData) -> Result<Quote, DataError> {
    let closes: Vec<f64> = data
        .indicators
        .quote
        .first()
        .map(|q| q.close.iter().flatten().copied().collect())
        .unwrap_or_default();

    let last_price = data
        .meta
        .regular_market_price
        .or_else(|| closes.last().copied());
    let previous_close = data
        .meta
        .previous_close
        .or(data.meta.chart_previous_close)
        .or_else(|| closes.iter().rev().nth(1).copied());

    match (last_price, previous_close) {
        (Some(last_price), Some(previous_close)) => Ok(Quote {
            last_price,
            previous_close,
        }),
        _ => Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        }),
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn history(&self, symbol: &str, range: &DateRange) -> Result<PriceHistory, DataError> {
        let data = self.get_chart(symbol, &self.history_url(symbol, range))?;
        let history = parse_history(data)?;
        debug!(symbol, rows = history.close.len(), "fetched history");
        Ok(history.between(range))
    }

    fn quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let data = self.get_chart(symbol, &self.quote_url(symbol))?;
        parse_quote(symbol, data)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn chart(json: &str) -> ChartResponse {
        serde_json::from_str(json).unwrap()
    }

    // 2024-03-01, 03-04, 03-05 at 14:30 UTC (09:30 New York).
    const HISTORY: &str = r#"{"chart":{"result":[{
        "meta":{"gmtoffset":-18000,"regularMarketPrice":5100.0,"chartPreviousClose":5000.0},
        "timestamp":[1709303400,1709562600,1709649000],
        "indicators":{
            "quote":[{"close":[5000.0,null,5100.0],"volume":[1.0e9,null,2.0e9]}],
            "adjclose":[{"adjclose":[4990.0,null,5090.0]}]
        }}],"error":null}}"#;

    #[test]
    fn history_prefers_adjusted_close_and_fills_gaps() {
        let data = first_result("^GSPC", chart(HISTORY)).unwrap();
        let h = parse_history(data).unwrap();
        assert_eq!(h.close.dates(), vec![d("2024-03-01"), d("2024-03-04"), d("2024-03-05")]);
        assert_eq!(h.close.values(), vec![4990.0, 4990.0, 5090.0]);
        assert_eq!(h.volume.values(), vec![1.0e9, 1.0e9, 2.0e9]);
    }

    #[test]
    fn history_without_timestamps_is_empty() {
        let json = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let data = first_result("X", chart(json)).unwrap();
        let h = parse_history(data).unwrap();
        assert!(h.close.is_empty());
    }

    #[test]
    fn not_found_maps_to_symbol_error() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let err = first_result("NOPE", chart(json)).unwrap_err();
        assert_eq!(
            err,
            DataError::SymbolNotFound {
                symbol: "NOPE".into()
            }
        );
    }

    #[test]
    fn other_chart_errors_are_malformed() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"x"}}}"#;
        assert!(matches!(
            first_result("X", chart(json)),
            Err(DataError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn quote_reads_meta() {
        let data = first_result("ES=F", chart(HISTORY)).unwrap();
        let q = parse_quote("ES=F", data).unwrap();
        assert_eq!(q.last_price, 5100.0);
        assert_eq!(q.previous_close, 5000.0);
        assert!((q.change_pct().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn quote_falls_back_to_closes() {
        let json = r#"{"chart":{"result":[{"meta":{},"timestamp":[1,2],
            "indicators":{"quote":[{"close":[10.0,11.0]}]}}],"error":null}}"#;
        let q = parse_quote("X", first_result("X", chart(json)).unwrap()).unwrap();
        assert_eq!((q.last_price, q.previous_close), (11.0, 10.0));
    }

    #[test]
    fn urls_carry_range_and_symbol() {
        let provider = YahooProvider::new(
            Arc::new(CircuitBreaker::default_provider()),
            Duration::from_secs(5),
        )
        .unwrap();
        let range = DateRange::new(d("1970-01-01"), d("1970-01-02")).unwrap();
        let url = provider.history_url("^GSPC", &range);
        assert!(url.ends_with("/^GSPC?period1=0&period2=172799&interval=1d&includeAdjustedClose=true"));
        assert!(provider.quote_url("ES=F").contains("ES=F?range=5d"));
    }
}
