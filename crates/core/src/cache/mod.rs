//! Cache backends.
//!
//! [`CacheAdapter`] is a plain byte-oriented key/value interface with
//! per-entry TTLs. It knows nothing about records or namespaces; the
//! coordinator decides what goes in and when it comes out. Two backends:
//!
//! - [`MemoryCache`]: in-process ordered map with lazy expiry and a size bound
//! - [`SqliteCache`]: SQLite table with `expires_at`, file-backed or in-memory

pub mod memory;
pub mod sqlite;

use std::time::Duration;

use crate::Error;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

/// Uniform interface over the cache backend.
///
/// Implementations report backend failures as [`Error::CacheUnavailable`].
#[async_trait::async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Fetch a live entry; expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Store `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error>;

    async fn delete(&self, key: &str) -> Result<(), Error>;

    /// Delete every entry whose key starts with `prefix`. Returns the count.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, Error>;

    /// Drop expired entries. Returns the count.
    async fn purge_expired(&self) -> Result<u64, Error>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), Error>;
}
