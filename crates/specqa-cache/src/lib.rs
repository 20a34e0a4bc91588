//! specqa-cache
//!
//! LRU cache with time-to-live for whole query responses, keyed by the
//! normalized question plus an optional context map.

pub mod clock;
pub mod query_cache;

pub use clock::{Clock, ManualClock, SystemClock};
pub use query_cache::{cache_key, CacheStats, QueryCache, RecentQuery};
