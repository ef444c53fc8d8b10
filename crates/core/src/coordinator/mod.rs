//! Cache coordination between callers, the cache backend and the store.
//!
//! The [`CacheCoordinator`] is the only component that writes record and
//! search keys. It provides:
//!
//! - Point lookups with negative caching and per-key single-flight
//! - Search pages keyed by a canonical query hash, with a shorter TTL
//! - Write-through for single records and batches
//! - Invalidation that completes before the write returns
//! - Fail-open behavior when the cache backend errors
//!
//! Writes are fenced against in-flight fetches: every write bumps an epoch
//! under an exclusive lock, and a fetch only populates the cache if the
//! epoch it observed before reading the store is still current. Writes also
//! detach in-flight handles for the keys they touch, so a lookup issued after
//! a write returns never joins a fetch that read the pre-write row.

pub mod entry;
pub mod keys;
pub mod singleflight;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Error;
use crate::cache::CacheAdapter;
use crate::config::CacheSettings;
use crate::query::SearchQuery;
use crate::record::{CompanyRecord, RecordPage, Upserted};
use crate::store::{BatchOutcome, RecordStore};

pub use entry::CacheEntry;
pub use keys::KeySpace;
pub use singleflight::SingleFlight;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    negative_hits: AtomicU64,
    misses: AtomicU64,
    store_fetches: AtomicU64,
    cache_errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of coordinator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CoordinatorStats {
    /// Lookups and searches answered from a cached value.
    pub hits: u64,
    /// Lookups answered from a tombstone.
    pub negative_hits: u64,
    /// Lookups and searches that found nothing usable in the cache.
    pub misses: u64,
    /// Store reads issued on behalf of misses.
    pub store_fetches: u64,
    /// Misses that reused another caller's in-flight fetch.
    pub coalesced: u64,
    /// Cache backend failures absorbed by serving from the store.
    pub cache_errors: u64,
}

/// Reachability of both backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HealthReport {
    pub store: bool,
    pub cache: bool,
}

/// Handles shared with spawned fetch tasks.
#[derive(Clone)]
struct FetchContext {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheAdapter>,
    counters: Arc<Counters>,
    write_epoch: Arc<RwLock<u64>>,
}

impl FetchContext {
    async fn observe_epoch(&self) -> u64 {
        *self.write_epoch.read().await
    }

    /// Cache `entry` unless a write has landed since `observed`.
    async fn populate_if_current(&self, observed: u64, key: &str, entry: &CacheEntry, ttl: Duration) {
        let epoch = self.write_epoch.read().await;
        if *epoch != observed {
            tracing::debug!(key, "write raced fetch, not caching result");
            return;
        }
        put_entry(self.cache.as_ref(), &self.counters, key, entry, ttl).await;
    }
}

async fn put_entry(cache: &dyn CacheAdapter, counters: &Counters, key: &str, entry: &CacheEntry, ttl: Duration) {
    let bytes = match entry.encode() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(key, "failed to encode cache entry: {e}");
            return;
        }
    };
    if let Err(e) = cache.set(key, bytes, ttl).await {
        Counters::bump(&counters.cache_errors);
        tracing::warn!(key, "cache write failed, continuing without cache: {e}");
    }
}

/// Coordinates reads and writes between the cache and the store.
///
/// Constructed once per process with injected backends; cheap to share
/// behind an `Arc`.
pub struct CacheCoordinator {
    ctx: FetchContext,
    settings: CacheSettings,
    keys: KeySpace,
    records: SingleFlight<Option<CompanyRecord>>,
    searches: SingleFlight<RecordPage>,
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn RecordStore>, cache: Arc<dyn CacheAdapter>, settings: CacheSettings) -> Self {
        let keys = KeySpace::new(settings.record_prefix.clone(), settings.search_prefix.clone());
        Self {
            ctx: FetchContext {
                store,
                cache,
                counters: Arc::new(Counters::default()),
                write_epoch: Arc::new(RwLock::new(0)),
            },
            settings,
            keys,
            records: SingleFlight::default(),
            searches: SingleFlight::default(),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Look a record up by uid, returning `None` when it does not exist.
    ///
    /// Tombstones answer without touching the store. Concurrent misses for
    /// the same uid share a single store read.
    pub async fn lookup_by_uid(&self, uid: &str) -> Result<Option<CompanyRecord>, Error> {
        let uid = uid.trim();
        if uid.is_empty() {
            return Err(Error::InvalidInput("uid cannot be empty".into()));
        }
        let key = self.keys.record(uid);

        match self.read_entry(&key).await {
            Some(CacheEntry::Record { record }) => {
                Counters::bump(&self.ctx.counters.hits);
                tracing::debug!(uid, "cache hit");
                return Ok(Some(record));
            }
            Some(CacheEntry::Tombstone) => {
                Counters::bump(&self.ctx.counters.negative_hits);
                tracing::debug!(uid, "negative cache hit");
                return Ok(None);
            }
            Some(CacheEntry::Page { .. }) | None => {}
        }
        Counters::bump(&self.ctx.counters.misses);

        let ctx = self.ctx.clone();
        let positive_ttl = self.settings.positive_ttl;
        let negative_ttl = self.settings.negative_ttl;
        let owned_uid = uid.to_string();
        let owned_key = key.clone();

        self.records
            .run(&key, move || async move {
                let observed = ctx.observe_epoch().await;
                Counters::bump(&ctx.counters.store_fetches);
                let found = ctx.store.get(&owned_uid).await?;

                let (entry, ttl) = match &found {
                    Some(record) => (CacheEntry::Record { record: record.clone() }, positive_ttl),
                    None => (CacheEntry::Tombstone, negative_ttl),
                };
                ctx.populate_if_current(observed, &owned_key, &entry, ttl).await;
                Ok(found)
            })
            .await
    }

    /// One page of search results.
    ///
    /// Non-empty pages are cached for the search TTL under a key derived from
    /// the canonical query and cursor; empty pages are never cached.
    pub async fn search(&self, query: &SearchQuery) -> Result<RecordPage, Error> {
        let canonical = query.canonicalize(self.settings.search_limits);
        let key = self.keys.search(&canonical);

        if let Some(CacheEntry::Page { page }) = self.read_entry(&key).await {
            Counters::bump(&self.ctx.counters.hits);
            tracing::debug!(key, "search cache hit");
            return Ok(page);
        }
        Counters::bump(&self.ctx.counters.misses);

        let ctx = self.ctx.clone();
        let search_ttl = self.settings.search_ttl;
        let owned_key = key.clone();

        self.searches
            .run(&key, move || async move {
                let observed = ctx.observe_epoch().await;
                Counters::bump(&ctx.counters.store_fetches);
                let page = ctx.store.query(&canonical).await?;

                if !page.is_empty() {
                    let entry = CacheEntry::Page { page: page.clone() };
                    ctx.populate_if_current(observed, &owned_key, &entry, search_ttl).await;
                }
                Ok(page)
            })
            .await
    }

    /// Write a record to the store and refresh its cache entry.
    ///
    /// On store failure the cache is left untouched and the error returned.
    /// On success the fresh row replaces any cached value and every search
    /// entry is cleared before this returns.
    pub async fn write_through(&self, record: &CompanyRecord) -> Result<Upserted, Error> {
        let upserted = self.ctx.store.upsert(record).await?;
        self.refresh_record(&upserted.record).await;
        self.invalidate_search().await;
        Ok(upserted)
    }

    /// Write a batch and refresh the cache entry of every stored item.
    ///
    /// Search entries are left alone; callers writing many batches clear the
    /// search namespace once with [`CacheCoordinator::invalidate_search`].
    pub async fn write_through_batch(&self, records: &[CompanyRecord]) -> Result<BatchOutcome, Error> {
        let outcomes = self.ctx.store.upsert_batch(records).await?;
        for upserted in outcomes.iter().flatten() {
            self.refresh_record(&upserted.record).await;
        }
        Ok(outcomes)
    }

    /// Delete a record from the store and invalidate its entries.
    pub async fn delete(&self, uid: &str) -> Result<bool, Error> {
        let existed = self.ctx.store.delete(uid).await?;
        self.invalidate(uid).await;
        Ok(existed)
    }

    /// Drop the cached record for `uid` and every search entry.
    pub async fn invalidate(&self, uid: &str) {
        let key = self.keys.record(uid);
        self.fence_writes(Some(&key)).await;
        self.delete_key(&key).await;
        self.invalidate_search().await;
    }

    /// Clear the whole search namespace with one prefix delete.
    pub async fn invalidate_search(&self) -> u64 {
        self.fence_writes(None).await;
        match self.ctx.cache.delete_by_prefix(self.keys.search_prefix()).await {
            Ok(count) => {
                tracing::debug!(count, "cleared search cache");
                count
            }
            Err(e) => {
                Counters::bump(&self.ctx.counters.cache_errors);
                tracing::warn!("search invalidation failed: {e}");
                0
            }
        }
    }

    /// Clear both namespaces.
    pub async fn flush(&self) -> Result<u64, Error> {
        self.fence_writes(None).await;
        self.records.forget_prefix(self.keys.record_prefix());
        let records = self.ctx.cache.delete_by_prefix(self.keys.record_prefix()).await?;
        let searches = self.ctx.cache.delete_by_prefix(self.keys.search_prefix()).await?;
        Ok(records + searches)
    }

    /// Drop expired entries from the cache backend.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        self.ctx.cache.purge_expired().await
    }

    pub async fn health_check(&self) -> HealthReport {
        HealthReport { store: self.ctx.store.ping().await.is_ok(), cache: self.ctx.cache.ping().await.is_ok() }
    }

    pub fn stats(&self) -> CoordinatorStats {
        let counters = &self.ctx.counters;
        CoordinatorStats {
            hits: counters.hits.load(Ordering::Relaxed),
            negative_hits: counters.negative_hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            store_fetches: counters.store_fetches.load(Ordering::Relaxed),
            coalesced: self.records.coalesced() + self.searches.coalesced(),
            cache_errors: counters.cache_errors.load(Ordering::Relaxed),
        }
    }

    async fn refresh_record(&self, record: &CompanyRecord) {
        let key = self.keys.record(&record.uid);
        self.fence_writes(Some(&key)).await;
        self.delete_key(&key).await;
        let entry = CacheEntry::Record { record: record.clone() };
        put_entry(self.ctx.cache.as_ref(), &self.ctx.counters, &key, &entry, self.settings.positive_ttl).await;
    }

    /// Stop in-flight fetches from publishing pre-write results.
    async fn fence_writes(&self, record_key: Option<&str>) {
        *self.ctx.write_epoch.write().await += 1;
        if let Some(key) = record_key {
            self.records.forget(key);
        }
        self.searches.forget_prefix(self.keys.search_prefix());
    }

    async fn delete_key(&self, key: &str) {
        if let Err(e) = self.ctx.cache.delete(key).await {
            Counters::bump(&self.ctx.counters.cache_errors);
            tracing::warn!(key, "cache delete failed: {e}");
        }
    }

    /// Read and decode an entry, treating every cache failure as a miss.
    async fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        match self.ctx.cache.get(key).await {
            Ok(Some(bytes)) => match CacheEntry::decode(&bytes) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(key, "discarding undecodable cache entry: {e}");
                    self.delete_key(key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                Counters::bump(&self.ctx.counters.cache_errors);
                tracing::warn!(key, "cache read failed, serving from store: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use futures_util::future::join_all;

    use crate::cache::MemoryCache;
    use crate::query::CanonicalQuery;
    use crate::store::SqliteStore;

    /// Store wrapper that counts reads and holds their results back.
    struct SlowStore {
        inner: SqliteStore,
        gets: AtomicUsize,
        queries: AtomicUsize,
        delay: Duration,
    }

    impl SlowStore {
        async fn new(delay: Duration) -> Self {
            Self {
                inner: SqliteStore::open_in_memory().await.unwrap(),
                gets: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait::async_trait]
    impl RecordStore for SlowStore {
        async fn get(&self, uid: &str) -> Result<Option<CompanyRecord>, Error> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let found = self.inner.get(uid).await;
            tokio::time::sleep(self.delay).await;
            found
        }

        async fn query(&self, query: &CanonicalQuery) -> Result<RecordPage, Error> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let page = self.inner.query(query).await;
            tokio::time::sleep(self.delay).await;
            page
        }

        async fn upsert_batch(&self, records: &[CompanyRecord]) -> Result<BatchOutcome, Error> {
            self.inner.upsert_batch(records).await
        }

        async fn scan(&self, cursor: Option<&str>, limit: usize) -> Result<RecordPage, Error> {
            self.inner.scan(cursor, limit).await
        }

        async fn delete(&self, uid: &str) -> Result<bool, Error> {
            self.inner.delete(uid).await
        }

        async fn ping(&self) -> Result<(), Error> {
            self.inner.ping().await
        }
    }

    /// Cache backend whose every operation fails.
    struct BrokenCache;

    #[async_trait::async_trait]
    impl CacheAdapter for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, Error> {
            Err(Error::CacheUnavailable("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), Error> {
            Err(Error::CacheUnavailable("connection refused".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), Error> {
            Err(Error::CacheUnavailable("connection refused".into()))
        }

        async fn delete_by_prefix(&self, _prefix: &str) -> Result<u64, Error> {
            Err(Error::CacheUnavailable("connection refused".into()))
        }

        async fn purge_expired(&self) -> Result<u64, Error> {
            Err(Error::CacheUnavailable("connection refused".into()))
        }

        async fn ping(&self) -> Result<(), Error> {
            Err(Error::CacheUnavailable("connection refused".into()))
        }
    }

    fn active(uid: &str, name: &str) -> CompanyRecord {
        CompanyRecord { status: Some("active".into()), ..CompanyRecord::new(uid, name) }
    }

    async fn setup(delay: Duration) -> (Arc<SlowStore>, Arc<MemoryCache>, CacheCoordinator) {
        setup_with(delay, CacheSettings::default()).await
    }

    async fn setup_with(
        delay: Duration, settings: CacheSettings,
    ) -> (Arc<SlowStore>, Arc<MemoryCache>, CacheCoordinator) {
        let store = Arc::new(SlowStore::new(delay).await);
        let cache = Arc::new(MemoryCache::default());
        let coordinator = CacheCoordinator::new(store.clone(), cache.clone(), settings);
        (store, cache, coordinator)
    }

    fn short_ttls() -> CacheSettings {
        CacheSettings {
            positive_ttl: Duration::from_millis(600),
            negative_ttl: Duration::from_millis(200),
            search_ttl: Duration::from_millis(300),
            ..CacheSettings::default()
        }
    }

    #[tokio::test]
    async fn test_lookup_caches_record() {
        let (store, _cache, coordinator) = setup(Duration::ZERO).await;
        coordinator.write_through(&active("BG1", "Acme")).await.unwrap();

        let first = coordinator.lookup_by_uid("BG1").await.unwrap().unwrap();
        let second = coordinator.lookup_by_uid("BG1").await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_missing_uid_is_tombstoned_until_written() {
        let (store, _cache, coordinator) = setup(Duration::ZERO).await;

        assert!(coordinator.lookup_by_uid("BG404").await.unwrap().is_none());
        assert!(coordinator.lookup_by_uid("BG404").await.unwrap().is_none());
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.stats().negative_hits, 1);

        coordinator.write_through(&active("BG404", "Late Ltd")).await.unwrap();
        let found = coordinator.lookup_by_uid("BG404").await.unwrap();
        assert_eq!(found.map(|r| r.name), Some("Late Ltd".to_string()));
    }

    #[tokio::test]
    async fn test_empty_uid_rejected() {
        let (_store, _cache, coordinator) = setup(Duration::ZERO).await;
        assert!(matches!(coordinator.lookup_by_uid("  ").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_read_store_once() {
        let (store, _cache, coordinator) = setup(Duration::from_millis(100)).await;
        store.inner.upsert(&active("BG1", "Acme")).await.unwrap();
        let coordinator = Arc::new(coordinator);

        let lookups = (0..32).map(|_| {
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.lookup_by_uid("BG1").await }
        });
        let results = join_all(lookups).await;

        assert!(results.iter().all(|r| matches!(r, Ok(Some(record)) if record.uid == "BG1")));
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.stats().store_fetches, 1);
    }

    #[tokio::test]
    async fn test_write_through_replaces_cached_value() {
        let (_store, _cache, coordinator) = setup(Duration::ZERO).await;
        coordinator.write_through(&active("BG1", "Acme")).await.unwrap();
        assert_eq!(coordinator.lookup_by_uid("BG1").await.unwrap().unwrap().name, "Acme");

        let upserted = coordinator.write_through(&active("BG1", "Acme Holdings")).await.unwrap();
        assert_eq!(upserted.status, crate::record::WriteStatus::Updated);
        assert_eq!(coordinator.lookup_by_uid("BG1").await.unwrap().unwrap().name, "Acme Holdings");
    }

    #[tokio::test]
    async fn test_write_during_fetch_is_not_overwritten() {
        let (store, _cache, coordinator) = setup(Duration::from_millis(100)).await;
        store.inner.upsert(&active("BG1", "Old Name")).await.unwrap();
        let coordinator = Arc::new(coordinator);

        let reader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.lookup_by_uid("BG1").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.write_through(&active("BG1", "New Name")).await.unwrap();

        let after = coordinator.lookup_by_uid("BG1").await.unwrap().unwrap();
        assert_eq!(after.name, "New Name");

        reader.await.unwrap().unwrap();
        let settled = coordinator.lookup_by_uid("BG1").await.unwrap().unwrap();
        assert_eq!(settled.name, "New Name");
    }

    #[tokio::test]
    async fn test_broken_cache_fails_open() {
        let store = Arc::new(SlowStore::new(Duration::ZERO).await);
        let coordinator = CacheCoordinator::new(store.clone(), Arc::new(BrokenCache), CacheSettings::default());

        let upserted = coordinator.write_through(&active("BG1", "Acme")).await.unwrap();
        assert_eq!(upserted.record.name, "Acme");

        let found = coordinator.lookup_by_uid("BG1").await.unwrap();
        assert_eq!(found.map(|r| r.uid), Some("BG1".to_string()));

        let page = coordinator.search(&SearchQuery { name: Some("acme".into()), ..Default::default() }).await.unwrap();
        assert_eq!(page.records.len(), 1);

        assert!(coordinator.stats().cache_errors > 0);
        assert!(!coordinator.health_check().await.cache);
        assert!(coordinator.health_check().await.store);
    }

    #[tokio::test]
    async fn test_search_cached_and_invalidated_by_write() {
        let (store, _cache, coordinator) = setup(Duration::ZERO).await;
        coordinator.write_through(&active("BG1", "Acme")).await.unwrap();
        let query = SearchQuery { name: Some("acme".into()), ..Default::default() };

        assert_eq!(coordinator.search(&query).await.unwrap().records.len(), 1);
        assert_eq!(coordinator.search(&query).await.unwrap().records.len(), 1);
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);

        coordinator.write_through(&active("BG2", "Acme Two")).await.unwrap();
        assert_eq!(coordinator.search(&query).await.unwrap().records.len(), 2);
        assert_eq!(store.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_search_pages_not_cached() {
        let (store, cache, coordinator) = setup(Duration::ZERO).await;
        let query = SearchQuery { name: Some("nothing".into()), ..Default::default() };

        assert!(coordinator.search(&query).await.unwrap().is_empty());
        assert!(coordinator.search(&query).await.unwrap().is_empty());
        assert_eq!(store.queries.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_batch_write_through_leaves_search_alone() {
        let (store, _cache, coordinator) = setup(Duration::ZERO).await;
        coordinator.write_through(&active("BG1", "Acme")).await.unwrap();
        let query = SearchQuery { name: Some("acme".into()), ..Default::default() };
        coordinator.search(&query).await.unwrap();

        let outcomes = coordinator.write_through_batch(&[active("BG2", "Acme Two")]).await.unwrap();
        assert!(outcomes[0].is_ok());
        assert_eq!(coordinator.search(&query).await.unwrap().records.len(), 1);

        coordinator.invalidate_search().await;
        assert_eq!(coordinator.search(&query).await.unwrap().records.len(), 2);
        assert_eq!(store.queries.load(Ordering::SeqCst), 2);
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.lookup_by_uid("BG2").await.unwrap().unwrap().name, "Acme Two");
    }

    #[tokio::test]
    async fn test_delete_invalidates_record() {
        let (_store, _cache, coordinator) = setup(Duration::ZERO).await;
        coordinator.write_through(&active("BG1", "Acme")).await.unwrap();
        assert!(coordinator.lookup_by_uid("BG1").await.unwrap().is_some());

        assert!(coordinator.delete("BG1").await.unwrap());
        assert!(coordinator.lookup_by_uid("BG1").await.unwrap().is_none());
        assert!(!coordinator.delete("BG1").await.unwrap());
    }

    #[tokio::test]
    async fn test_flush_clears_both_namespaces() {
        let (_store, cache, coordinator) = setup(Duration::ZERO).await;
        coordinator.write_through(&active("BG1", "Acme")).await.unwrap();
        coordinator.search(&SearchQuery::default()).await.unwrap();
        assert_eq!(cache.len().await, 2);

        assert_eq!(coordinator.flush().await.unwrap(), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_tombstone_expires_after_negative_ttl() {
        let (store, _cache, coordinator) = setup_with(Duration::ZERO, short_ttls()).await;

        assert!(coordinator.lookup_by_uid("BG7").await.unwrap().is_none());
        // Written behind the coordinator's back, so only expiry can reveal it.
        store.inner.upsert(&active("BG7", "Quiet Ltd")).await.unwrap();
        assert!(coordinator.lookup_by_uid("BG7").await.unwrap().is_none());
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(350)).await;

        let found = coordinator.lookup_by_uid("BG7").await.unwrap();
        assert_eq!(found.map(|r| r.name), Some("Quiet Ltd".to_string()));
        assert_eq!(store.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_record_expires_after_positive_ttl() {
        let (store, _cache, coordinator) = setup_with(Duration::ZERO, short_ttls()).await;
        coordinator.write_through(&active("BG1", "Acme")).await.unwrap();
        store.inner.upsert(&active("BG1", "Acme Renamed")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(coordinator.lookup_by_uid("BG1").await.unwrap().unwrap().name, "Acme");
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(coordinator.lookup_by_uid("BG1").await.unwrap().unwrap().name, "Acme Renamed");
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_page_expires_after_search_ttl() {
        let (store, _cache, coordinator) = setup_with(Duration::ZERO, short_ttls()).await;
        coordinator.write_through(&active("BG1", "Acme")).await.unwrap();
        let query = SearchQuery { name: Some("acme".into()), ..Default::default() };

        coordinator.search(&query).await.unwrap();
        coordinator.search(&query).await.unwrap();
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        coordinator.search(&query).await.unwrap();
        assert_eq!(store.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_equivalent_searches_share_cache_entry() {
        let (store, _cache, coordinator) = setup(Duration::ZERO).await;
        coordinator.write_through(&active("BG1", "Acme")).await.unwrap();

        let upper = SearchQuery { name: Some("ACME ".into()), ..Default::default() };
        let lower = SearchQuery { name: Some("acme".into()), limit: Some(25), ..Default::default() };
        assert_eq!(coordinator.search(&upper).await.unwrap().records.len(), 1);
        assert_eq!(coordinator.search(&lower).await.unwrap().records.len(), 1);
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
    }
}
