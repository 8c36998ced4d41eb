//! Process-memory cache tier.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{CacheEntry, CacheError, CacheTier};

/// Unbounded in-memory tier living for the process lifetime.
///
/// Operations never fail. A poisoned lock is recovered because entries are
/// replaced atomically and cannot be left half-written.
#[derive(Debug)]
pub struct MemoryTier<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for MemoryTier<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> MemoryTier<V> {
    /// Create an empty tier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the tier holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> CacheTier<V> for MemoryTier<V>
where
    V: Clone + Send,
{
    fn get(&self, key: &str) -> Result<Option<CacheEntry<V>>, CacheError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, entry: CacheEntry<V>) -> Result<(), CacheError> {
        self.lock().insert(key.to_owned(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.lock().remove(key);
        Ok(())
    }
}
