//! Exponentially weighted mean (adjusted form).
//!
//! `y_t = Σ (1-α)^i x_{t-i} / Σ (1-α)^i` over every observation so far,
//! i.e. each weight is normalized by the weights actually seen. Positions
//! before `min_periods` observations are undefined.

/// Adjusted EWM mean with smoothing factor `alpha` in `(0, 1]`.
pub fn ewm_mean(values: &[f64], alpha: f64, min_periods: usize) -> Vec<Option<f64>> {
    let decay = 1.0 - alpha;
    let mut num = 0.0;
    let mut den = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            num = x + decay * num;
            den = 1.0 + decay * den;
            (i + 1 >= min_periods.max(1)).then(|| num / den)
        })
        .collect()
}
