//! Two-level cache shared by geocoding, suggestion and routing lookups.
//!
//! A [`CacheTier`] stores timestamped [`CacheEntry`] values under string keys.
//! [`LayeredCache`] composes tiers in order: reads fall through and promote
//! hits upwards, writes go through to every tier. Tier 1 is process memory
//! ([`MemoryTier`]); tier 2 is a persisted store such as
//! [`SqliteTier`](crate::cache::SqliteTier) whose entries expire after a TTL.
//!
//! The cache is not correctness-critical. Staleness up to the TTL window is
//! acceptable and persisted-tier failures are logged and swallowed.

mod layered;
mod memory;
#[cfg(feature = "store-sqlite")]
mod sqlite;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

pub use layered::LayeredCache;
pub use memory::MemoryTier;
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteTier, SqliteTierError};

/// TTL applied to persisted geocode results and suggestion lists.
pub const GEOCODE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// TTL applied to persisted route metrics.
pub const ROUTE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// A cached value with the wall-clock time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The cached value.
    pub value: V,
    /// Milliseconds since the Unix epoch when the value was stored.
    pub stored_at_epoch_ms: u64,
}

impl<V> CacheEntry<V> {
    /// Wrap `value` with the given write timestamp.
    pub const fn new(value: V, stored_at_epoch_ms: u64) -> Self {
        Self {
            value,
            stored_at_epoch_ms,
        }
    }

    /// Whether the entry has reached `ttl` at time `now_ms`.
    ///
    /// An entry exactly `ttl` old is expired. Entries stamped in the future
    /// (clock skew) are treated as fresh.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64, ttl: Duration) -> bool {
        let age = now_ms.saturating_sub(self.stored_at_epoch_ms);
        u128::from(age) >= ttl.as_millis()
    }
}

/// Errors raised by a [`CacheTier`] backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The backend is unavailable or refused the operation (e.g. quota).
    #[error("cache backend failure: {message}")]
    Backend {
        /// Backend-supplied detail.
        message: String,
    },
    /// A stored value could not be encoded or decoded.
    #[error("cache serialisation failed: {message}")]
    Serialization {
        /// Codec-supplied detail.
        message: String,
    },
}

/// One storage level of a [`LayeredCache`].
///
/// Implementations store entries verbatim; expiry is decided by the layered
/// cache, which knows each tier's TTL. Writes are atomic replacements.
pub trait CacheTier<V>: Send + Sync {
    /// Read the entry stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<CacheEntry<V>>, CacheError>;

    /// Store `entry` under `key`, replacing any previous entry.
    fn set(&self, key: &str, entry: CacheEntry<V>) -> Result<(), CacheError>;

    /// Delete the entry stored under `key`. Deleting a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Source of wall-clock time for TTL decisions.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_epoch_ms(&self) -> u64;
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            })
    }
}
