//! Process-wide entry point tying the store, cache, coordinator, import
//! pipeline and export stream together.

use std::sync::Arc;

use crate::Error;
use crate::cache::{CacheAdapter, MemoryCache, SqliteCache};
use crate::config::{AppConfig, CacheBackend};
use crate::coordinator::{CacheCoordinator, CoordinatorStats, HealthReport};
use crate::export::ExportStream;
use crate::import::{ImportPipeline, ImportReport, RecordValidator};
use crate::query::SearchQuery;
use crate::record::{CompanyRecord, RecordPage};
use crate::store::{RecordStore, SqliteStore};

/// The company register.
///
/// Build one per process and share it behind an `Arc`.
pub struct Registry {
    store: Arc<dyn RecordStore>,
    coordinator: Arc<CacheCoordinator>,
    importer: ImportPipeline,
    export_page_size: usize,
}

impl Registry {
    /// Open the configured store and cache backends.
    pub async fn open(config: &AppConfig) -> Result<Self, Error> {
        let store = SqliteStore::open(&config.db_path).await?;
        let cache: Arc<dyn CacheAdapter> = match config.cache_backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new(config.cache_max_entries)),
            CacheBackend::Sqlite if config.cache_in_memory() => Arc::new(SqliteCache::open_in_memory().await?),
            CacheBackend::Sqlite => Arc::new(SqliteCache::open(&config.cache_db_path).await?),
        };

        tracing::info!(
            db_path = %config.db_path.display(),
            cache_backend = ?config.cache_backend,
            "opened company register"
        );
        Ok(Self::new(Arc::new(store), cache, config))
    }

    /// Assemble a registry from already-open backends.
    pub fn new(store: Arc<dyn RecordStore>, cache: Arc<dyn CacheAdapter>, config: &AppConfig) -> Self {
        let coordinator = Arc::new(CacheCoordinator::new(Arc::clone(&store), cache, config.cache_settings()));
        let importer = ImportPipeline::new(Arc::clone(&coordinator), config.import_chunk_size);
        Self { store, coordinator, importer, export_page_size: config.export_page_size }
    }

    /// Replace the import validator.
    pub fn with_validator(mut self, validator: Arc<dyn RecordValidator>, chunk_size: usize) -> Self {
        self.importer = ImportPipeline::with_validator(Arc::clone(&self.coordinator), validator, chunk_size);
        self
    }

    pub fn coordinator(&self) -> &Arc<CacheCoordinator> {
        &self.coordinator
    }

    pub async fn lookup_by_uid(&self, uid: &str) -> Result<Option<CompanyRecord>, Error> {
        self.coordinator.lookup_by_uid(uid).await
    }

    /// Like [`Registry::lookup_by_uid`], with absence reported as an error.
    pub async fn get_company(&self, uid: &str) -> Result<CompanyRecord, Error> {
        self.lookup_by_uid(uid).await?.ok_or_else(|| Error::RecordNotFound(uid.trim().to_string()))
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<RecordPage, Error> {
        self.coordinator.search(query).await
    }

    pub async fn import_batch(&self, records: &[CompanyRecord]) -> ImportReport {
        self.importer.import_batch(records).await
    }

    pub async fn delete(&self, uid: &str) -> Result<bool, Error> {
        self.coordinator.delete(uid).await
    }

    /// One export page after `cursor`, bypassing the cache.
    pub async fn export_page(&self, cursor: Option<&str>, page_size: Option<usize>) -> Result<RecordPage, Error> {
        let page_size = page_size.unwrap_or(self.export_page_size).clamp(1, self.export_page_size.max(1));
        self.store.scan(cursor, page_size).await
    }

    /// A stream over every record, starting from the beginning.
    pub fn export_all(&self) -> ExportStream {
        ExportStream::new(Arc::clone(&self.store), self.export_page_size)
    }

    pub fn resume_export(&self, cursor: impl Into<String>) -> ExportStream {
        ExportStream::resume(Arc::clone(&self.store), self.export_page_size, cursor)
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    pub async fn purge_expired(&self) -> Result<u64, Error> {
        self.coordinator.purge_expired().await
    }

    pub async fn flush(&self) -> Result<u64, Error> {
        self.coordinator.flush().await
    }

    pub async fn health_check(&self) -> HealthReport {
        self.coordinator.health_check().await
    }
}
