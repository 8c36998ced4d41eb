//! SQLite-backed persisted cache tier.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::{CacheEntry, CacheError, CacheTier};

/// Error raised when opening the persisted cache store.
#[derive(Debug, Error)]
pub enum SqliteTierError {
    /// Opening the SQLite database failed.
    #[error("failed to open cache database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating the cache table failed.
    #[error("failed to initialise cache schema: {source}")]
    Schema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
}

/// Persisted tier storing JSON-encoded values in a `cache_entries` table.
///
/// Several tiers may share one database: each is scoped to a namespace and
/// [`SqliteTier::for_namespace`] reuses the connection. The database is meant
/// to be session-scoped, e.g. an in-memory database or a per-session file.
///
/// An optional entry cap emulates a storage quota: writes of new keys beyond
/// the cap fail with [`CacheError::Backend`].
pub struct SqliteTier<V> {
    connection: Arc<Mutex<Connection>>,
    namespace: String,
    max_entries: Option<usize>,
    _value: PhantomData<fn() -> V>,
}

impl<V> fmt::Debug for SqliteTier<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteTier")
            .field("namespace", &self.namespace)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl<V> SqliteTier<V> {
    /// Open (or create) a file-backed store.
    pub fn open(path: &Path, namespace: &str) -> Result<Self, SqliteTierError> {
        let connection =
            Connection::open(path).map_err(|source| SqliteTierError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection, namespace)
    }

    /// Create a store that lives as long as the process.
    pub fn in_memory(namespace: &str) -> Result<Self, SqliteTierError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteTierError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::from_connection(connection, namespace)
    }

    fn from_connection(connection: Connection, namespace: &str) -> Result<Self, SqliteTierError> {
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS cache_entries (
                    namespace TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    stored_at_ms INTEGER NOT NULL,
                    PRIMARY KEY (namespace, key)
                ) WITHOUT ROWID",
                [],
            )
            .map_err(|source| SqliteTierError::Schema { source })?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            namespace: namespace.to_owned(),
            max_entries: None,
            _value: PhantomData,
        })
    }

    /// A tier over the same database scoped to another namespace.
    #[must_use]
    pub fn for_namespace<W>(&self, namespace: &str) -> SqliteTier<W> {
        SqliteTier {
            connection: Arc::clone(&self.connection),
            namespace: namespace.to_owned(),
            max_entries: self.max_entries,
            _value: PhantomData,
        }
    }

    /// Cap the number of entries held in this namespace.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Namespace this tier reads and writes.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_capacity(&self, connection: &Connection, key: &str) -> Result<(), CacheError> {
        let Some(max_entries) = self.max_entries else {
            return Ok(());
        };
        let others: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM cache_entries WHERE namespace = ?1 AND key != ?2",
                params![self.namespace, key],
                |row| row.get(0),
            )
            .map_err(backend)?;
        let others = usize::try_from(others).unwrap_or(usize::MAX);
        if others >= max_entries {
            return Err(CacheError::Backend {
                message: format!(
                    "quota exceeded: namespace {:?} holds {others} entries",
                    self.namespace
                ),
            });
        }
        Ok(())
    }
}

fn backend(err: rusqlite::Error) -> CacheError {
    CacheError::Backend {
        message: err.to_string(),
    }
}

fn serialization(message: impl fmt::Display) -> CacheError {
    CacheError::Serialization {
        message: message.to_string(),
    }
}

impl<V> CacheTier<V> for SqliteTier<V>
where
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &str) -> Result<Option<CacheEntry<V>>, CacheError> {
        let row: Option<(String, i64)> = self
            .lock()
            .query_row(
                "SELECT value, stored_at_ms FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(backend)?;
        let Some((payload, stored_at)) = row else {
            return Ok(None);
        };
        let value = serde_json::from_str(&payload).map_err(serialization)?;
        let stored_at_epoch_ms = u64::try_from(stored_at).map_err(serialization)?;
        Ok(Some(CacheEntry::new(value, stored_at_epoch_ms)))
    }

    fn set(&self, key: &str, entry: CacheEntry<V>) -> Result<(), CacheError> {
        let payload = serde_json::to_string(&entry.value).map_err(serialization)?;
        let stored_at = i64::try_from(entry.stored_at_epoch_ms).map_err(serialization)?;
        let connection = self.lock();
        self.ensure_capacity(&connection, key)?;
        connection
            .execute(
                "INSERT INTO cache_entries (namespace, key, value, stored_at_ms)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (namespace, key)
                 DO UPDATE SET value = excluded.value, stored_at_ms = excluded.stored_at_ms",
                params![self.namespace, key, payload, stored_at],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.lock()
            .execute(
                "DELETE FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
            )
            .map_err(backend)?;
        Ok(())
    }
}
