//! MarketLens Core — series model, provider adapters, cache, alignment, derived metrics.
//!
//! This crate contains the data pipeline underneath the dashboard:
//! - Domain types (time series, aligned tables, recession overlays)
//! - Provider adapters (Yahoo chart API, FRED, CNN Fear & Greed, put/call ratio)
//! - TTL cache with per-key single flight and an injectable clock
//! - Outer/left alignment of named series
//! - Derived metrics (returns, ratios, moving averages, RSI, liquidity index)

pub mod align;
pub mod cache;
pub mod calendar;
pub mod data;
pub mod domain;
pub mod frame;
pub mod metrics;
