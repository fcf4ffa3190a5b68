//! Relative Strength Index (RSI).
//!
//! Deltas of consecutive values split into gains `max(Δ, 0)` and losses
//! `max(-Δ, 0)`, each smoothed over `period`.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge cases: avg_loss == 0 → 100; both zero → 50 (no movement).

use super::ewm::ewm_mean;
use super::sma::MovingAverage;
use super::Derivation;
use serde::{Deserialize, Serialize};

/// How gains and losses are averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSmoothing {
    /// Adjusted EWM with alpha `1/period` and `period` minimum observations.
    #[default]
    Exponential,
    /// Rolling mean over `period` deltas.
    Simple,
}

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    smoothing: RsiSmoothing,
    name: String,
}

impl Rsi {
    pub fn new(period: usize, smoothing: RsiSmoothing) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            smoothing,
            name: format!("RSI {period}"),
        }
    }
}

impl Derivation for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, values: &[f64]) -> Vec<Option<f64>> {
        let n = values.len();
        let mut result = vec![None; n];
        if n <= self.period {
            return result;
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = values
            .windows(2)
            .map(|w| {
                let delta = w[1] - w[0];
                (delta.max(0.0), (-delta).max(0.0))
            })
            .unzip();

        let (avg_gain, avg_loss) = match self.smoothing {
            RsiSmoothing::Exponential => {
                let alpha = 1.0 / self.period as f64;
                (
                    ewm_mean(&gains, alpha, self.period),
                    ewm_mean(&losses, alpha, self.period),
                )
            }
            RsiSmoothing::Simple => {
                let ma = MovingAverage::new(self.period);
                (ma.compute(&gains), ma.compute(&losses))
            }
        };

        // Delta i describes the move into value i + 1.
        for (i, (g, l)) in avg_gain.into_iter().zip(avg_loss).enumerate() {
            if let (Some(g), Some(l)) = (g, l) {
                // Rolling sums can leave -0.0 or tiny negative residue.
                result[i + 1] = Some(compute_rsi(g.max(0.0), l.max(0.0)));
            }
        }
        result
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::assert_approx;

    #[test]
    fn all_gains_is_100() {
        let result = Rsi::new(3, RsiSmoothing::Exponential)
            .compute(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        assert!(result[..3].iter().all(Option::is_none));
        for v in &result[3..] {
            assert_approx(v.unwrap(), 100.0, 1e-9);
        }
    }

    #[test]
    fn all_losses_is_0() {
        let result = Rsi::new(3, RsiSmoothing::Simple)
            .compute(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        for v in &result[3..] {
            assert_approx(v.unwrap(), 0.0, 1e-9);
        }
    }

    #[test]
    fn flat_is_50() {
        let result = Rsi::new(2, RsiSmoothing::Exponential).compute(&[7.0; 5]);
        assert_eq!(result[2], Some(50.0));
    }

    #[test]
    fn simple_mixed() {
        // Changes: +0.34, -0.25, -0.48, +0.72
        // Window over the first three: gain 0.34/3, loss 0.73/3
        let result = Rsi::new(3, RsiSmoothing::Simple).compute(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        let expected = 100.0 - 100.0 / (1.0 + 0.34 / 0.73);
        assert_approx(result[3].unwrap(), expected, 1e-9);
        // Window over the last three: gain 0.72/3, loss 0.73/3
        let expected = 100.0 - 100.0 / (1.0 + 0.72 / 0.73);
        assert_approx(result[4].unwrap(), expected, 1e-9);
    }

    #[test]
    fn exponential_mixed() {
        // alpha = 1/2, decay 1/2; deltas +1, -2, +3
        // gains  [1, 0, 3] → at i=1: (0 + 0.5*1)/1.5, at i=2: (3 + 0 + 0.25)/1.75
        // losses [0, 2, 0] → at i=1: 2/1.5,          at i=2: (0 + 1 + 0)/1.75
        let result = Rsi::new(2, RsiSmoothing::Exponential).compute(&[10.0, 11.0, 9.0, 12.0]);
        assert_eq!(result[..2], [None, None]);
        let rs1 = 0.5 / 2.0;
        assert_approx(result[2].unwrap(), 100.0 - 100.0 / (1.0 + rs1), 1e-9);
        let rs2 = 3.25 / 1.0;
        assert_approx(result[3].unwrap(), 100.0 - 100.0 / (1.0 + rs2), 1e-9);
    }

    #[test]
    fn too_short_is_undefined() {
        assert_eq!(
            Rsi::new(14, RsiSmoothing::Exponential).compute(&[1.0, 2.0]),
            vec![None, None]
        );
    }

    #[test]
    fn naming() {
        assert_eq!(Rsi::new(14, RsiSmoothing::Simple).name(), "RSI 14");
    }
}
