//! Ordered composition of cache tiers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use super::{CacheEntry, CacheTier, Clock, MemoryTier, SystemClock};

struct Layer<V> {
    tier: Arc<dyn CacheTier<V>>,
    ttl: Option<Duration>,
}

/// Cache that consults its tiers in order.
///
/// - Reads return the first fresh hit and copy it into every earlier tier,
///   preserving the original write timestamp. Expired entries are deleted
///   from the tier that held them.
/// - Writes go through to every tier. Failures are logged and swallowed: the
///   first tier remains authoritative for the process lifetime.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tripfare_core::{LayeredCache, MemoryTier, SystemClock};
///
/// let persisted = Arc::new(MemoryTier::new());
/// let cache = LayeredCache::new("example", Arc::new(SystemClock))
///     .with_tier(Arc::new(MemoryTier::new()), None)
///     .with_tier(persisted, Some(Duration::from_secs(3600)));
///
/// cache.set("pune", 42_u32);
/// assert_eq!(cache.get("pune"), Some(42));
/// ```
pub struct LayeredCache<V> {
    label: &'static str,
    layers: Vec<Layer<V>>,
    clock: Arc<dyn Clock>,
}

impl<V> fmt::Debug for LayeredCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredCache")
            .field("label", &self.label)
            .field("tiers", &self.layers.len())
            .finish_non_exhaustive()
    }
}

impl<V> LayeredCache<V>
where
    V: Clone + Send + 'static,
{
    /// Create a cache without tiers. `label` identifies it in log output.
    #[must_use]
    pub fn new(label: &'static str, clock: Arc<dyn Clock>) -> Self {
        Self {
            label,
            layers: Vec::new(),
            clock,
        }
    }

    /// Create a cache with a single process-memory tier.
    #[must_use]
    pub fn in_memory(label: &'static str) -> Self {
        Self::new(label, Arc::new(SystemClock)).with_tier(Arc::new(MemoryTier::new()), None)
    }

    /// Append a tier consulted after the existing ones.
    ///
    /// Entries older than `ttl` are treated as absent; `None` disables
    /// expiry for this tier.
    #[must_use]
    pub fn with_tier(mut self, tier: Arc<dyn CacheTier<V>>, ttl: Option<Duration>) -> Self {
        self.layers.push(Layer { tier, ttl });
        self
    }

    /// Number of configured tiers.
    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.layers.len()
    }

    /// Expiry of the tier at `index`; `None` for a tier that never expires
    /// or an index past the last tier.
    #[must_use]
    pub fn tier_ttl(&self, index: usize) -> Option<Duration> {
        self.layers.get(index).and_then(|layer| layer.ttl)
    }

    /// Return the first fresh value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_epoch_ms();
        for (index, layer) in self.layers.iter().enumerate() {
            let entry = match layer.tier.get(key) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(err) => {
                    warn!("{} cache tier {index} read failed for {key:?}: {err}", self.label);
                    continue;
                }
            };
            if layer.ttl.is_some_and(|ttl| entry.is_expired(now, ttl)) {
                debug!("{} cache tier {index} entry for {key:?} expired", self.label);
                if let Err(err) = layer.tier.remove(key) {
                    warn!("{} cache tier {index} purge failed for {key:?}: {err}", self.label);
                }
                continue;
            }
            debug!("{} cache hit in tier {index} for {key:?}", self.label);
            self.promote(index, key, &entry);
            return Some(entry.value);
        }
        debug!("{} cache miss for {key:?}", self.label);
        None
    }

    /// Store `value` in every tier.
    pub fn set(&self, key: &str, value: V) {
        self.write(self.layers.len(), key, value);
    }

    /// Store `value` in the first tier only.
    ///
    /// Used for one-off keys that should not grow the persisted store.
    pub fn set_local(&self, key: &str, value: V) {
        self.write(1, key, value);
    }

    fn write(&self, depth: usize, key: &str, value: V) {
        let entry = CacheEntry::new(value, self.clock.now_epoch_ms());
        for (index, layer) in self.layers.iter().take(depth).enumerate() {
            if let Err(err) = layer.tier.set(key, entry.clone()) {
                warn!("{} cache tier {index} write failed for {key:?}: {err}", self.label);
            }
        }
    }

    fn promote(&self, hit_index: usize, key: &str, entry: &CacheEntry<V>) {
        for (index, layer) in self.layers.iter().take(hit_index).enumerate() {
            if let Err(err) = layer.tier.set(key, entry.clone()) {
                warn!("{} cache tier {index} promotion failed for {key:?}: {err}", self.label);
            }
        }
    }
}
