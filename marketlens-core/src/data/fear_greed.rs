//! CNN Fear & Greed index provider.
//!
//! The graph-data endpoint refuses requests without a browser User-Agent, so
//! every call picks one at random from the pool. The payload carries both the
//! score history and CNN's own rating for the current reading.

use super::http::{build_client, get_json, pick_user_agent, RetryPolicy};
use super::provider::{DataError, SentimentProvider, SentimentReading, SeriesProvider};
use crate::calendar::date_from_epoch_millis;
use crate::domain::{DateRange, TimeSeries};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use std::time::Duration;

const PROVIDER: &str = "cnn_fear_greed";
const BASE_URL: &str = "https://production.dataviz.cnn.io/index/fearandgreed/graphdata";

/// Series id served by this provider.
pub const FEAR_GREED_ID: &str = "fear_greed";

#[derive(Debug, Deserialize)]
struct GraphData {
    #[serde(default)]
    fear_and_greed: Option<Current>,
    fear_and_greed_historical: Historical,
}

#[derive(Debug, Deserialize)]
struct Current {
    rating: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Historical {
    data: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: Option<f64>,
}

pub struct FearGreedProvider {
    client: Client,
    retry: RetryPolicy,
    base_url: String,
}

impl FearGreedProvider {
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

fn parse_reading(data: GraphData) -> Result<SentimentReading, DataError> {
    let rating = data
        .fear_and_greed
        .as_ref()
        .and_then(|c| c.rating.as_deref())
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty());
    Ok(SentimentReading {
        scores: parse_graph(data)?,
        rating,
    })
}

fn parse_graph(data: GraphData) -> Result<TimeSeries, DataError> {
    let mut rows = Vec::with_capacity(data.fear_and_greed_historical.data.len());
    for p in data.fear_and_greed_historical.data {
        let date = date_from_epoch_millis(p.x)
            .ok_or_else(|| DataError::malformed(PROVIDER, format!("invalid timestamp {}", p.x)))?;
        rows.push((date, p.y));
    }
    Ok(TimeSeries::from_sparse(rows))
}

impl FearGreedProvider {
    fn graph(&self, range: &DateRange) -> Result<GraphData, DataError> {
        let url = format!("{}/{}", self.base_url, range.start().format("%Y-%m-%d"));
        get_json(
            PROVIDER,
            || {
                let agent = pick_user_agent(&mut rand::thread_rng());
                self.client.get(&url).header(USER_AGENT, agent).send()
            },
            None,
            self.retry,
        )
    }
}

impl SentimentProvider for FearGreedProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn sentiment(&self, range: &DateRange) -> Result<SentimentReading, DataError> {
        let mut reading = parse_reading(self.graph(range)?)?;
        reading.scores = reading.scores.between(range);
        Ok(reading)
    }
}

impl SeriesProvider for FearGreedProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn fetch(&self, series_id: &str, range: &DateRange) -> Result<TimeSeries, DataError> {
        if series_id != FEAR_GREED_ID {
            return Err(DataError::InvalidSeriesId {
                id: series_id.to_string(),
                reason: format!("only '{FEAR_GREED_ID}' is served"),
            });
        }
        Ok(parse_graph(self.graph(range)?)?.between(range))
    }
}
