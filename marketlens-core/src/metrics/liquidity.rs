//! USD liquidity index: Fed balance sheet minus reverse repo minus TGA.
//!
//! The three inputs come from different releases in different units and on
//! different calendars (weekly vs daily). Each is scaled to dollars, the
//! three are outer-joined, forward-filled, and only rows where all three
//! have a value are kept.

use crate::align::{merge, JoinKind};
use crate::domain::{Observation, TableError, TimeSeries};
use serde::{Deserialize, Serialize};

pub const LIQUIDITY_COLUMN: &str = "USD Liquidity Index";

/// Reporting unit of a monetary series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    Dollars,
    Thousands,
    Millions,
    Billions,
    Trillions,
}

impl Unit {
    pub fn factor(self) -> f64 {
        match self {
            Self::Dollars => 1.0,
            Self::Thousands => 1e3,
            Self::Millions => 1e6,
            Self::Billions => 1e9,
            Self::Trillions => 1e12,
        }
    }
}

/// A series together with the unit it is reported in.
#[derive(Debug, Clone, Copy)]
pub struct ScaledSeries<'a> {
    pub series: &'a TimeSeries,
    pub unit: Unit,
}

impl<'a> ScaledSeries<'a> {
    pub fn new(series: &'a TimeSeries, unit: Unit) -> Self {
        Self { series, unit }
    }

    fn in_dollars(&self) -> TimeSeries {
        self.series.scaled(self.unit.factor())
    }
}

/// `fed_balance_sheet - reverse_repo - tga` in dollars.
pub fn liquidity_index(
    fed_balance_sheet: ScaledSeries<'_>,
    reverse_repo: ScaledSeries<'_>,
    tga: ScaledSeries<'_>,
) -> Result<TimeSeries, TableError> {
    let (fed, rrp, tga) = (
        fed_balance_sheet.in_dollars(),
        reverse_repo.in_dollars(),
        tga.in_dollars(),
    );
    let table = merge(&[("fed", &fed), ("rrp", &rrp), ("tga", &tga)], JoinKind::Outer)?
        .forward_filled()
        .drop_incomplete();

    let (fed, rrp, tga) = (table.series("fed")?, table.series("rrp")?, table.series("tga")?);
    Ok(TimeSeries::from_unsorted(
        fed.iter()
            .zip(rrp.iter())
            .zip(tga.iter())
            .map(|((f, r), t)| Observation::new(f.date, f.value - r.value - t.value))
            .collect(),
    ))
}
