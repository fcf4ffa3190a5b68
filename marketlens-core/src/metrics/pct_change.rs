//! Percentage change over a fixed number of rows (YoY on monthly data).

use super::Derivation;

/// `(v[i] / v[i-k] - 1) * 100`; undefined for the first `k` rows and where
/// the reference is zero.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let old = *values.get(i.checked_sub(periods)?)?;
            (old != 0.0).then(|| (values[i] / old - 1.0) * 100.0)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PctChange {
    periods: usize,
    name: String,
}

impl PctChange {
    pub fn new(periods: usize, name: impl Into<String>) -> Self {
        assert!(periods >= 1, "pct_change periods must be >= 1");
        Self {
            periods,
            name: name.into(),
        }
    }
}

impl Derivation for PctChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.periods
    }

    fn compute(&self, values: &[f64]) -> Vec<Option<f64>> {
        pct_change(values, self.periods)
    }
}
