//! Provider traits and structured error types.
//!
//! Traits abstract over the upstream sources so the pipeline can swap
//! implementations and tests can substitute fakes:
//! - [`SeriesProvider`] for single-value series (macro data, options flow)
//! - [`MarketDataProvider`] for price history and latest quotes
//! - [`SentimentProvider`] for a sentiment index and its published rating
//!
//! "No data" is `Ok` with an empty series. Every upstream failure is a
//! [`DataError`].

use crate::align::{merge, JoinKind};
use crate::domain::{DateRange, SeriesTable, TimeSeries};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Structured error types for provider operations.
///
/// Cloneable so a cached failure can be handed to every waiting caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("{provider}: network unreachable: {reason}")]
    Network { provider: String, reason: String },

    #[error("{provider}: HTTP {status}")]
    HttpStatus { provider: String, status: u16 },

    #[error("{provider}: rate limited (retry after {retry_after_secs}s)")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    #[error("{provider}: malformed payload: {reason}")]
    MalformedPayload { provider: String, reason: String },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("'{id}' did not report within {elapsed_ms}ms")]
    Timeout { id: String, elapsed_ms: u64 },

    #[error("{provider}: missing credentials ({hint})")]
    MissingCredentials { provider: String, hint: String },

    #[error("invalid series id '{id}': {reason}")]
    InvalidSeriesId { id: String, reason: String },
}

impl DataError {
    /// Transport-level failure: the upstream could not be reached or refused us.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::HttpStatus { .. }
                | Self::RateLimited { .. }
                | Self::CircuitBreakerTripped
                | Self::Timeout { .. }
        )
    }

    pub(crate) fn malformed(provider: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }
}

/// Latest quote for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub last_price: f64,
    pub previous_close: f64,
}

impl Quote {
    /// Percentage move from the previous close; `None` when that close is zero.
    pub fn change_pct(&self) -> Option<f64> {
        if self.previous_close == 0.0 {
            None
        } else {
            Some((self.last_price / self.previous_close - 1.0) * 100.0)
        }
    }
}

/// Daily history for one symbol: adjusted close and traded volume.
///
/// `volume` may be empty for instruments that report none (indices, FX).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceHistory {
    pub close: TimeSeries,
    pub volume: TimeSeries,
}

impl PriceHistory {
    /// Both series restricted to `range`.
    pub fn between(&self, range: &DateRange) -> Self {
        Self {
            close: self.close.between(range),
            volume: self.volume.between(range),
        }
    }
}

/// Sentiment scores plus the rating the upstream publishes for the latest one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentimentReading {
    pub scores: TimeSeries,
    /// Lower-case label such as `"extreme greed"`; `None` when the upstream sent none.
    pub rating: Option<String>,
}

/// Outcome of a multi-series fetch: the merged successes plus attributed failures.
#[derive(Debug, Clone, Default)]
pub struct FetchBatch {
    pub table: SeriesTable,
    pub failures: Vec<(String, DataError)>,
}

/// Source of single-value daily series addressed by an id.
pub trait SeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch one series over `range`.
    fn fetch(&self, series_id: &str, range: &DateRange) -> Result<TimeSeries, DataError>;

    /// Fetch several series and outer-join the successes, each column named
    /// after its id. One id failing does not stop the others.
    fn fetch_many(&self, ids: &[&str], range: &DateRange) -> FetchBatch {
        let mut fetched: Vec<(&str, TimeSeries)> = Vec::with_capacity(ids.len());
        let mut failures = Vec::new();
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(*id) {
                continue;
            }
            match self.fetch(id, range) {
                Ok(series) => fetched.push((*id, series)),
                Err(e) => {
                    warn!(provider = self.name(), id, error = %e, "series fetch failed");
                    failures.push((id.to_string(), e));
                }
            }
        }

        let inputs: Vec<(&str, &TimeSeries)> = fetched.iter().map(|(id, s)| (*id, s)).collect();
        // Ids are unique here, so the merge cannot reject a column.
        let table = merge(&inputs, JoinKind::Outer).unwrap_or_default();
        FetchBatch { table, failures }
    }

    /// Whether the provider is currently accepting requests.
    fn is_available(&self) -> bool {
        true
    }
}

/// Source of market prices: bulk history and single latest quotes.
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    fn history(&self, symbol: &str, range: &DateRange) -> Result<PriceHistory, DataError>;

    fn quote(&self, symbol: &str) -> Result<Quote, DataError>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Source of a sentiment index.
pub trait SentimentProvider: Send + Sync {
    fn name(&self) -> &str;

    fn sentiment(&self, range: &DateRange) -> Result<SentimentReading, DataError>;
}
