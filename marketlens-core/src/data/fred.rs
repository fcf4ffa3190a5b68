//! FRED macro-data provider (`fred/series/observations`).

use super::http::{build_client, get_json, RetryPolicy};
use super::provider::{DataError, SeriesProvider};
use crate::calendar::parse_date;
use crate::domain::{DateRange, TimeSeries};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "fred";
const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "FRED_API_KEY";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

pub struct FredProvider {
    client: Client,
    api_key: Option<String>,
    retry: RetryPolicy,
    base_url: String,
}

impl FredProvider {
    /// `api_key` falls back to `FRED_API_KEY`; a missing key only fails on fetch.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, DataError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()));
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            api_key,
            retry: RetryPolicy::default(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Observations → series. `"."` marks a missing value and is forward-filled.
fn parse_observations(resp: ObservationsResponse) -> Result<TimeSeries, DataError> {
    let mut rows = Vec::with_capacity(resp.observations.len());
    for obs in resp.observations {
        let date = parse_date(&obs.date).ok_or_else(|| {
            DataError::malformed(PROVIDER, format!("bad observation date '{}'", obs.date))
        })?;
        let value = match obs.value.trim() {
            "." | "" => None,
            raw => Some(raw.parse::<f64>().map_err(|_| {
                DataError::malformed(PROVIDER, format!("bad value '{raw}' on {date}"))
            })?),
        };
        rows.push((date, value));
    }
    Ok(TimeSeries::from_sparse(rows))
}

impl SeriesProvider for FredProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn fetch(&self, series_id: &str, range: &DateRange) -> Result<TimeSeries, DataError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DataError::MissingCredentials {
                provider: PROVIDER.to_string(),
                hint: format!("set [macro] api_key or {API_KEY_ENV}"),
            })?;
        let start = range.start().format("%Y-%m-%d").to_string();
        let end = range.end().format("%Y-%m-%d").to_string();
        let resp: ObservationsResponse = get_json(
            PROVIDER,
            || {
                self.client
                    .get(&self.base_url)
                    .query(&[
                        ("series_id", series_id),
                        ("api_key", api_key),
                        ("file_type", "json"),
                        ("observation_start", start.as_str()),
                        ("observation_end", end.as_str()),
                    ])
                    .send()
            },
            None,
            self.retry,
        )?;
        let series = parse_observations(resp)?;
        debug!(series_id, rows = series.len(), "fetched FRED series");
        Ok(series)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parse(json: &str) -> Result<TimeSeries, DataError> {
        parse_observations(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn dot_is_missing_and_forward_filled() {
        let s = parse(
            r#"{"observations":[
                {"date":"2024-01-01","value":"."},
                {"date":"2024-01-02","value":"3.95"},
                {"date":"2024-01-03","value":"."},
                {"date":"2024-01-04","value":"3.99"},
                {"date":"2024-01-05","value":"."}
            ]}"#,
        )
        .unwrap();
        assert_eq!(s.values(), vec![3.95, 3.95, 3.99]);
        assert_eq!(
            s.last().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()
        );
    }

    #[test]
    fn unparsable_value_is_malformed() {
        let err = parse(r#"{"observations":[{"date":"2024-01-01","value":"abc"}]}"#).unwrap_err();
        assert!(matches!(err, DataError::MalformedPayload { .. }));
    }

    #[test]
    fn empty_observations_are_no_data() {
        assert!(parse(r#"{"observations":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_key_is_reported_on_fetch() {
        let provider = FredProvider {
            client: Client::new(),
            api_key: None,
            retry: RetryPolicy::default(),
            base_url: BASE_URL.to_string(),
        };
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            provider.fetch("DGS10", &range),
            Err(DataError::MissingCredentials { .. })
        ));
        assert!(!provider.is_available());
    }
}
