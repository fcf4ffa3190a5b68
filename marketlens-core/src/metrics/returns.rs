//! Fixed-horizon returns on observation offsets.

use crate::domain::TimeSeries;
use serde::{Deserialize, Serialize};

/// Reference point for the 30-day horizon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThirtyDayBasis {
    /// Thirty observations back (`s[n-30]`).
    #[default]
    Lookback,
    /// First observation of the fetched window (`s[0]`).
    WindowStart,
}

/// Latest price plus percentage returns. A horizon is `None` when the
/// series is too short or its reference value is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Returns {
    pub price: f64,
    pub d1: Option<f64>,
    pub d7: Option<f64>,
    pub d30: Option<f64>,
}

fn pct(new: f64, old: f64) -> Option<f64> {
    (old != 0.0).then(|| (new / old - 1.0) * 100.0)
}

/// Returns measured on observation offsets, not calendar days.
///
/// `d1` compares against `s[n-2]`, `d7` against `s[n-7]`, `d30` per `basis`.
/// Empty series → `None`.
pub fn returns(series: &TimeSeries, basis: ThirtyDayBasis) -> Option<Returns> {
    let values = series.values();
    let n = values.len();
    let price = *values.last()?;
    let back = |offset: usize| (n >= offset).then(|| values[n - offset]);

    let d30_ref = match basis {
        ThirtyDayBasis::Lookback => back(30),
        ThirtyDayBasis::WindowStart => (n >= 2).then(|| values[0]),
    };

    Some(Returns {
        price,
        d1: back(2).and_then(|old| pct(price, old)),
        d7: back(7).and_then(|old| pct(price, old)),
        d30: d30_ref.and_then(|old| pct(price, old)),
    })
}
