//! Cache layer: TTL memoization keyed by call signature.

pub mod clock;
pub mod key;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use ttl::{CacheEntry, CacheStats, StalePolicy, TtlCache, DEFAULT_TTL};
