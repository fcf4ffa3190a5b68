//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. One-day return is exact
//! 2. Ratio round-trips through multiplication
//! 3. A window-1 moving average reproduces its input
//! 4. Monotone series pin RSI at its bounds
//! 5. Outer merge index is the sorted union of input dates
//! 6. RSI stays inside [0, 100]

use chrono::{Duration, NaiveDate};
use marketlens_core::align::{merge, JoinKind};
use marketlens_core::domain::TimeSeries;
use marketlens_core::metrics::{
    ratio, returns, Derivation, MovingAverage, Rsi, RsiSmoothing, ThirtyDayBasis,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..10_000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_prices(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), min..max)
}

fn arb_dates() -> impl Strategy<Value = BTreeSet<i64>> {
    prop::collection::btree_set(0..400i64, 0..40)
}

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn daily(values: &[f64]) -> TimeSeries {
    TimeSeries::from_pairs(
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (base() + Duration::days(i as i64), v)),
    )
    .unwrap()
}

fn on_days(days: &BTreeSet<i64>) -> TimeSeries {
    TimeSeries::from_pairs(days.iter().map(|&d| (base() + Duration::days(d), d as f64 + 1.0)))
        .unwrap()
}

// ── 1. Returns ───────────────────────────────────────────────────────

proptest! {
    /// d1 = (last / second-to-last - 1) * 100, exactly as computed.
    #[test]
    fn d1_matches_last_two(values in arb_prices(2, 60)) {
        let n = values.len();
        let r = returns(&daily(&values), ThirtyDayBasis::Lookback).unwrap();
        let expected = (values[n - 1] / values[n - 2] - 1.0) * 100.0;
        prop_assert!((r.d1.unwrap() - expected).abs() < 1e-9);
        prop_assert_eq!(r.price, values[n - 1]);
        prop_assert_eq!(r.d7.is_some(), n >= 7);
        prop_assert_eq!(r.d30.is_some(), n >= 30);
    }
}

// ── 2. Ratio ─────────────────────────────────────────────────────────

proptest! {
    /// ratio(A, B) * B == A wherever B is non-zero.
    #[test]
    fn ratio_round_trips(pairs in prop::collection::vec((arb_price(), arb_price()), 0..50)) {
        let a: Vec<Option<f64>> = pairs.iter().map(|(x, _)| Some(*x)).collect();
        let b: Vec<Option<f64>> = pairs.iter().map(|(_, y)| Some(*y)).collect();
        let r = ratio(&a, &b);
        prop_assert_eq!(r.len(), pairs.len());
        for (q, (x, y)) in r.iter().zip(&pairs) {
            let back = q.unwrap() * y;
            prop_assert!((back - x).abs() <= 1e-9 * x.abs().max(1.0));
        }
    }
}

// ── 3. Moving average ────────────────────────────────────────────────

proptest! {
    /// Window 1 reproduces the input exactly.
    #[test]
    fn window_one_is_identity(values in arb_prices(0, 80)) {
        let out = MovingAverage::new(1).compute(&values);
        let expected: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        prop_assert_eq!(out, expected);
    }

    /// First `w - 1` positions are undefined, the rest defined.
    #[test]
    fn warmup_prefix_undefined(values in arb_prices(0, 80), w in 1usize..30) {
        let out = MovingAverage::new(w).compute(&values);
        for (i, v) in out.iter().enumerate() {
            prop_assert_eq!(v.is_some(), i + 1 >= w);
        }
    }
}

// ── 4/6. RSI ─────────────────────────────────────────────────────────

proptest! {
    /// Strictly increasing → 100; strictly decreasing → 0.
    #[test]
    fn monotone_series_hit_bounds(
        start in arb_price(),
        steps in prop::collection::vec(0.01..50.0_f64, 15..60),
        period in 2usize..14,
    ) {
        let mut up = vec![start];
        for s in &steps {
            up.push(up.last().unwrap() + s);
        }
        let down: Vec<f64> = up.iter().rev().copied().collect();

        for smoothing in [RsiSmoothing::Exponential, RsiSmoothing::Simple] {
            let rsi = Rsi::new(period, smoothing);
            for v in rsi.compute(&up).into_iter().flatten() {
                prop_assert!((v - 100.0).abs() < 1e-9);
            }
            for v in rsi.compute(&down).into_iter().flatten() {
                prop_assert!(v.abs() < 1e-9);
            }
        }
    }

    /// RSI is bounded and undefined for exactly the first `period` positions.
    #[test]
    fn rsi_bounded(values in arb_prices(0, 120), period in 1usize..20) {
        let out = Rsi::new(period, RsiSmoothing::Exponential).compute(&values);
        prop_assert_eq!(out.len(), values.len());
        for (i, v) in out.iter().enumerate() {
            prop_assert_eq!(v.is_some(), i >= period);
            if let Some(v) = v {
                prop_assert!((0.0..=100.0).contains(v));
            }
        }
    }
}

// ── 5. Merge ─────────────────────────────────────────────────────────

proptest! {
    /// Outer merge index equals the sorted union, each column keeps its values.
    #[test]
    fn merge_index_is_sorted_union(a in arb_dates(), b in arb_dates(), c in arb_dates()) {
        let (sa, sb, sc) = (on_days(&a), on_days(&b), on_days(&c));
        let table = merge(&[("a", &sa), ("b", &sb), ("c", &sc)], JoinKind::Outer).unwrap();

        let union: Vec<NaiveDate> = a
            .union(&b)
            .copied()
            .collect::<BTreeSet<_>>()
            .union(&c)
            .map(|&d| base() + Duration::days(d))
            .collect();
        prop_assert_eq!(table.index(), union.as_slice());
        prop_assert_eq!(table.series("a").unwrap(), sa);
        prop_assert_eq!(table.series("c").unwrap(), sc);
    }
}
