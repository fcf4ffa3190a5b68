//! Cached data entry points behind the dashboard.
//!
//! `Sources` bundles one handle per upstream, built once and passed in; the
//! pipeline never reaches for a global client. Each entry point is memoized
//! in a `TtlCache` keyed by its function name and arguments, so a render
//! that touches the same data from several panels fetches it once.

use crate::config::{DashboardConfig, Instrument, UnitSeries};
use crate::quotes::{fetch_quotes, QuoteBoard};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use marketlens_core::align::{join, merge, JoinKind};
use marketlens_core::cache::{CacheKey, Clock, SystemClock, TtlCache};
use marketlens_core::data::{
    CircuitBreaker, DataError, FearGreedProvider, FetchBatch, FredProvider, MarketDataProvider,
    PriceHistory, PutCallProvider, SentimentProvider, SentimentReading, SeriesProvider,
    YahooProvider,
};
use marketlens_core::domain::{DateRange, SeriesError, SeriesTable, TableError, TimeSeries};
use marketlens_core::metrics::{liquidity_index, ScaledSeries};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Range(#[from] SeriesError),

    #[error("cache key for {function}: {reason}")]
    CacheKey { function: String, reason: String },
}

impl PipelineError {
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::Data(e) if e.is_upstream_unavailable())
    }
}

/// One handle per upstream.
#[derive(Clone)]
pub struct Sources {
    pub market: Arc<dyn MarketDataProvider>,
    pub macro_data: Arc<dyn SeriesProvider>,
    pub sentiment: Arc<dyn SentimentProvider>,
    pub options: Arc<dyn SeriesProvider>,
}

impl Sources {
    /// HTTP adapters for Yahoo, FRED, CNN and alphaquery.
    pub fn live(config: &DashboardConfig) -> Result<Self, DataError> {
        let timeout = config.fetch.http_timeout();
        let breaker = Arc::new(CircuitBreaker::default_provider());
        Ok(Self {
            market: Arc::new(YahooProvider::new(breaker, timeout)?),
            macro_data: Arc::new(FredProvider::new(config.macro_data.api_key.clone(), timeout)?),
            sentiment: Arc::new(FearGreedProvider::new(timeout)?),
            options: Arc::new(PutCallProvider::new(timeout)?),
        })
    }
}

/// Index histories merged on one calendar.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    /// One close column per index that answered, plus configured ratios.
    pub prices: SeriesTable,
    /// Volume columns for indices that report one.
    pub volumes: SeriesTable,
    /// Indices that failed, by display name.
    pub failures: Vec<(String, DataError)>,
}

pub struct Pipeline {
    config: DashboardConfig,
    sources: Sources,
    today: NaiveDate,
    market_cache: TtlCache<MarketData>,
    macro_cache: TtlCache<FetchBatch>,
    series_cache: TtlCache<TimeSeries>,
    sentiment_cache: TtlCache<SentimentReading>,
}

fn cache_key<A: Serialize + ?Sized>(function: &str, args: &A) -> Result<CacheKey, PipelineError> {
    CacheKey::new(function, args).map_err(|e| PipelineError::CacheKey {
        function: function.to_string(),
        reason: e.to_string(),
    })
}

impl Pipeline {
    pub fn new(config: DashboardConfig, sources: Sources) -> Self {
        Self::with_clock(config, sources, Arc::new(SystemClock), Local::now().date_naive())
    }

    /// Pipeline with an explicit cache clock and calendar date.
    pub fn with_clock(
        config: DashboardConfig,
        sources: Sources,
        clock: Arc<dyn Clock>,
        today: NaiveDate,
    ) -> Self {
        let ttl = config.cache.ttl();
        let policy = config.cache.stale_policy;
        Self {
            market_cache: TtlCache::with_clock(ttl, Arc::clone(&clock)).with_stale_policy(policy),
            macro_cache: TtlCache::with_clock(ttl, Arc::clone(&clock)).with_stale_policy(policy),
            series_cache: TtlCache::with_clock(ttl, Arc::clone(&clock)).with_stale_policy(policy),
            sentiment_cache: TtlCache::with_clock(ttl, clock).with_stale_policy(policy),
            config,
            sources,
            today,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Configured history start through today.
    pub fn history_range(&self) -> Result<DateRange, PipelineError> {
        Ok(DateRange::new(self.config.fetch.history_start, self.today)?)
    }

    /// Drop every cached value.
    pub fn clear_cache(&self) {
        self.market_cache.clear();
        self.macro_cache.clear();
        self.series_cache.clear();
        self.sentiment_cache.clear();
    }

    /// Close (and volume) history for every configured index, outer-merged.
    ///
    /// Histories are fetched in parallel. Failed indices are reported in
    /// `MarketData::failures`; the call only fails when no index answered.
    pub fn market_data(&self) -> Result<MarketData, PipelineError> {
        let range = self.history_range()?;
        let market = &self.config.market;
        let key = cache_key("market_data", &(&market.indices, &market.ratios, range))?;
        self.market_cache
            .get_or_compute(&key, || self.load_market(&market.indices, &range))
    }

    fn load_market(
        &self,
        indices: &[Instrument],
        range: &DateRange,
    ) -> Result<MarketData, PipelineError> {
        info!(count = indices.len(), "fetching index histories");
        let fetched: Vec<(&Instrument, Result<PriceHistory, DataError>)> = indices
            .par_iter()
            .map(|i| (i, self.sources.market.history(&i.symbol, range)))
            .collect();

        let mut histories = Vec::with_capacity(fetched.len());
        let mut failures = Vec::new();
        for (instrument, result) in fetched {
            match result {
                Ok(history) => histories.push((instrument.name.as_str(), history)),
                Err(e) => {
                    warn!(symbol = %instrument.symbol, error = %e, "history fetch failed");
                    failures.push((instrument.name.clone(), e));
                }
            }
        }
        if histories.is_empty() {
            if let Some((_, e)) = failures.into_iter().next() {
                return Err(e.into());
            }
            return Ok(MarketData::default());
        }

        let closes: Vec<(&str, &TimeSeries)> =
            histories.iter().map(|(name, h)| (*name, &h.close)).collect();
        let mut prices = merge(&closes, JoinKind::Outer)?;
        for ratio in &self.config.market.ratios {
            if prices.has_column(&ratio.numerator) && prices.has_column(&ratio.denominator) {
                prices.add_ratio(&ratio.name, &ratio.numerator, &ratio.denominator)?;
            } else {
                debug!(ratio = %ratio.name, "ratio input missing, skipped");
            }
        }

        let volume_inputs: Vec<(&str, &TimeSeries)> = histories
            .iter()
            .filter(|(_, h)| !h.volume.is_empty())
            .map(|(name, h)| (*name, &h.volume))
            .collect();
        let volumes = merge(&volume_inputs, JoinKind::Outer)?;

        Ok(MarketData {
            prices,
            volumes,
            failures,
        })
    }

    /// Configured FRED series, outer-merged and renamed to display names.
    pub fn macro_data(&self) -> Result<FetchBatch, PipelineError> {
        let range = self.history_range()?;
        let series = &self.config.macro_data.series;
        let key = cache_key("macro_data", &(series, range))?;
        self.macro_cache.get_or_compute(&key, || -> Result<_, PipelineError> {
            let ids: Vec<&str> = series.iter().map(|s| s.symbol.as_str()).collect();
            let batch = self.sources.macro_data.fetch_many(&ids, &range);
            if batch.table.width() == 0 {
                if let Some((_, e)) = batch.failures.into_iter().next() {
                    return Err(e.into());
                }
                return Ok(FetchBatch::default());
            }

            let FetchBatch {
                mut table,
                failures,
            } = batch;
            for s in series {
                if table.has_column(&s.symbol) && !table.has_column(&s.name) {
                    table.rename_column(&s.symbol, &s.name)?;
                }
            }
            let failures = failures
                .into_iter()
                .map(|(id, e)| (display_name(series, &id), e))
                .collect();
            Ok(FetchBatch { table, failures })
        })
    }

    /// Index closes with the macro series left-joined onto the market calendar.
    pub fn market_with_macro(&self) -> Result<SeriesTable, PipelineError> {
        let market = self.market_data()?;
        match self.macro_data() {
            Ok(batch) => Ok(join(&market.prices, &batch.table, JoinKind::Left)?),
            Err(e) => {
                warn!(error = %e, "macro series unavailable, market table only");
                Ok(market.prices)
            }
        }
    }

    /// USD liquidity index (Fed balance sheet minus reverse repo minus TGA).
    pub fn liquidity_index(&self) -> Result<TimeSeries, PipelineError> {
        let range = self.history_range()?;
        let liquidity = &self.config.macro_data.liquidity;
        let key = cache_key("liquidity_index", &(liquidity, range))?;
        self.series_cache.get_or_compute(&key, || -> Result<_, PipelineError> {
            let fetch = |s: &UnitSeries| self.sources.macro_data.fetch(&s.id, &range);
            let fed = fetch(&liquidity.fed_balance_sheet)?;
            let rrp = fetch(&liquidity.reverse_repo)?;
            let tga = fetch(&liquidity.tga)?;
            Ok(liquidity_index(
                ScaledSeries::new(&fed, liquidity.fed_balance_sheet.unit),
                ScaledSeries::new(&rrp, liquidity.reverse_repo.unit),
                ScaledSeries::new(&tga, liquidity.tga.unit),
            )?)
        })
    }

    /// Fear & Greed scores over the configured lookback, with the published rating.
    pub fn sentiment(&self) -> Result<SentimentReading, PipelineError> {
        let start = self.today - ChronoDuration::days(self.config.sentiment.lookback_days);
        let range = DateRange::new(start, self.today)?;
        let key = cache_key("sentiment", &range)?;
        self.sentiment_cache.get_or_compute(&key, || -> Result<_, PipelineError> {
            Ok(self.sources.sentiment.sentiment(&range)?)
        })
    }

    /// Put/call ratio for the configured ticker over `window` (e.g. `30-Day`).
    pub fn put_call(&self, window: &str) -> Result<TimeSeries, PipelineError> {
        let range = self.history_range()?;
        let id = format!("{}:{window}", self.config.options.ticker);
        let key = cache_key("put_call", &(&id, range))?;
        self.series_cache.get_or_compute(&key, || -> Result<_, PipelineError> {
            Ok(self.sources.options.fetch(&id, &range)?)
        })
    }

    /// Live quotes for the configured futures. Never cached.
    pub fn quotes(&self) -> QuoteBoard {
        fetch_quotes(
            Arc::clone(&self.sources.market),
            &self.config.market.futures,
            self.config.fetch.quote_deadline(),
        )
    }
}

fn display_name(series: &[Instrument], id: &str) -> String {
    series
        .iter()
        .find(|s| s.symbol == id)
        .map_or_else(|| id.to_string(), |s| s.name.clone())
}
