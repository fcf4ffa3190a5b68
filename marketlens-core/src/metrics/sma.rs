//! Simple moving average.
//!
//! Trailing mean over `window` observations. The first `window - 1`
//! positions are undefined; `window == 1` reproduces the input.

use super::Derivation;
use crate::domain::TimeSeries;

#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    name: String,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "moving average window must be >= 1");
        Self {
            window,
            name: format!("{window}D MA"),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Derivation for MovingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, values: &[f64]) -> Vec<Option<f64>> {
        let n = values.len();
        let w = self.window;
        let mut result = vec![None; n];
        if n < w {
            return result;
        }

        let mut sum: f64 = values[..w].iter().sum();
        result[w - 1] = Some(sum / w as f64);
        for i in w..n {
            sum += values[i] - values[i - w];
            result[i] = Some(sum / w as f64);
        }
        result
    }
}

/// Moving average of `series`, defined points only.
pub fn moving_average(series: &TimeSeries, window: usize) -> TimeSeries {
    super::derive_series(series, &MovingAverage::new(window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{assert_approx, make_series, DEFAULT_EPSILON};

    #[test]
    fn ma_5_basic() {
        let result = MovingAverage::new(5).compute(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        assert_eq!(result.len(), 7);
        assert!(result[..4].iter().all(Option::is_none));
        assert_approx(result[4].unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(result[5].unwrap(), 13.0, DEFAULT_EPSILON);
        assert_approx(result[6].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn window_one_is_identity() {
        let input = [100.0, 200.0, 300.0];
        let result = MovingAverage::new(1).compute(&input);
        assert_eq!(result, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }

    #[test]
    fn short_input_all_undefined() {
        assert_eq!(MovingAverage::new(7).compute(&[1.0, 2.0]), vec![None, None]);
        assert!(MovingAverage::new(7).compute(&[]).is_empty());
    }

    #[test]
    fn naming_and_lookback() {
        let ma = MovingAverage::new(25);
        assert_eq!(ma.name(), "25D MA");
        assert_eq!(ma.lookback(), 24);
    }

    #[test]
    fn series_helper_keeps_defined_points() {
        let s = moving_average(&make_series(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert_eq!(s.values(), vec![2.0, 3.0]);
        assert_eq!(s.first().unwrap().date, make_series(&[0.0; 3]).last().unwrap().date);
    }

    #[test]
    #[should_panic(expected = "window must be >= 1")]
    fn zero_window_panics() {
        let _ = MovingAverage::new(0);
    }
}
