//! Provider adapters: market data, macro data, sentiment, options flow.

pub mod circuit_breaker;
pub mod fear_greed;
pub mod fred;
pub mod http;
pub mod provider;
pub mod put_call;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use fear_greed::{FearGreedProvider, FEAR_GREED_ID};
pub use fred::FredProvider;
pub use http::RetryPolicy;
pub use provider::{
    DataError, FetchBatch, MarketDataProvider, PriceHistory, Quote, SentimentProvider,
    SentimentReading, SeriesProvider,
};
pub use put_call::{PutCallId, PutCallProvider};
pub use yahoo::YahooProvider;
