//! SQLite cache backend.
//!
//! Entries live in a `cache_entries` table keyed by the namespaced cache key.
//! Expiry is enforced on read (`expires_at > now`) and expired rows are
//! removed by [`CacheAdapter::purge_expired`].

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_rusqlite::{Connection, params};

use super::CacheAdapter;
use crate::Error;
use crate::db::{self, MigrationSet, connection};

/// Schema of the `cache_entries` table.
pub static SCHEMA: MigrationSet = MigrationSet {
    table: "_cache_migrations",
    steps: &[(1, include_str!("../../migrations/cache/001_cache_entries.sql"))],
};

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Open a cache database at the specified path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = connection::open(path, &SCHEMA).await.map_err(Error::into_cache_error)?;
        Ok(Self { conn })
    }

    /// Open an in-memory cache database.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = connection::open_in_memory(&SCHEMA).await.map_err(Error::into_cache_error)?;
        Ok(Self { conn })
    }
}

/// Longest TTL honored; keeps `expires_at` a four-digit-year timestamp so
/// text comparison stays chronological.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 86_400);

fn expiry(ttl: Duration) -> String {
    let now = Utc::now();
    let expires_at: DateTime<Utc> = chrono::Duration::from_std(ttl.min(MAX_TTL))
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(now);
    db::timestamp(expires_at)
}

#[async_trait::async_trait]
impl CacheAdapter for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let key = key.to_string();
        let now = db::now();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let mut stmt = conn.prepare("SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2")?;

                match stmt.query_row(params![key, now], |row| row.get(0)) {
                    Ok(value) => Ok(Some(value)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
            .map_err(Error::into_cache_error)
    }

    /// Uses UPSERT semantics: inserts if the key doesn't exist, replaces the
    /// value and expiry if it does.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        let key = key.to_string();
        let stored_at = db::now();
        let expires_at = expiry(ttl);
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, value, stored_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        stored_at = excluded.stored_at,
                        expires_at = excluded.expires_at",
                    params![key, value, stored_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
            .map_err(Error::into_cache_error)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
            .map_err(Error::into_cache_error)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let prefix = prefix.to_string();
        let len = prefix.chars().count() as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count =
                    conn.execute("DELETE FROM cache_entries WHERE substr(key, 1, ?2) = ?1", params![prefix, len])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
            .map_err(Error::into_cache_error)
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let now = db::now();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
            .map_err(Error::into_cache_error)
    }

    async fn ping(&self) -> Result<(), Error> {
        connection::ping(&self.conn).await.map_err(Error::into_cache_error)
    }
}
