//! In-process cache backend on top of `moka`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

use super::CacheAdapter;
use crate::Error;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Arc<[u8]>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct EntryTtl;

impl Expiry<String, MemoryEntry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &MemoryEntry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self, _key: &String, entry: &MemoryEntry, _updated_at: Instant, _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Bounded concurrent cache with per-entry expiry.
///
/// Expired entries never read back; they are dropped from memory during
/// moka's maintenance, which [`CacheAdapter::purge_expired`] forces.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, MemoryEntry>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries.max(1) as u64)
            .expire_after(EntryTtl)
            .build();
        Self { entries }
    }

    /// Number of live entries after pending maintenance has run.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait::async_trait]
impl CacheAdapter for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.entries.get(key).await.map(|entry| entry.value.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        let entry = MemoryEntry { value: value.into(), ttl };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    /// Invalidates matching keys one by one, so the entries are gone when
    /// this returns and later writes under the prefix are unaffected.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let keys: Vec<Arc<String>> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();
        for key in &keys {
            self.entries.invalidate(key.as_str()).await;
        }
        Ok(keys.len() as u64)
    }

    /// The count is how far the entry count shrank, so it can lag writes
    /// that maintenance had not yet recorded.
    async fn purge_expired(&self) -> Result<u64, Error> {
        let before = self.entries.entry_count();
        self.entries.run_pending_tasks().await;
        Ok(before.saturating_sub(self.entries.entry_count()))
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}
