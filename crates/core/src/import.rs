//! Bulk import of company records.
//!
//! A batch is split into chunks, validated item by item, written through the
//! coordinator, and reported per item in input order. The search namespace
//! is cleared once at the end rather than once per item.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::coordinator::CacheCoordinator;
use crate::record::{CompanyRecord, WriteStatus};

/// Checks a record before it is sent to the store.
pub trait RecordValidator: Send + Sync {
    /// Return [`Error::ImportItemInvalid`] describing the first problem found.
    fn validate(&self, record: &CompanyRecord) -> Result<(), Error>;
}

/// Requires a non-empty uid without whitespace and a non-empty name.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredFields;

impl RecordValidator for RequiredFields {
    fn validate(&self, record: &CompanyRecord) -> Result<(), Error> {
        if record.uid.is_empty() {
            return Err(Error::ImportItemInvalid("uid is required".into()));
        }
        if record.uid.chars().any(char::is_whitespace) {
            return Err(Error::ImportItemInvalid(format!("uid {:?} contains whitespace", record.uid)));
        }
        if record.name.trim().is_empty() {
            return Err(Error::ImportItemInvalid(format!("name is required for {}", record.uid)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Created,
    Updated,
    Failed,
}

impl From<WriteStatus> for ImportStatus {
    fn from(status: WriteStatus) -> Self {
        match status {
            WriteStatus::Created => ImportStatus::Created,
            WriteStatus::Updated => ImportStatus::Updated,
        }
    }
}

/// Result for one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImportOutcome {
    /// Position of the item in the submitted batch.
    pub index: usize,
    pub uid: String,
    pub status: ImportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportOutcome {
    fn failed(index: usize, uid: &str, error: &Error) -> Self {
        Self { index, uid: uid.to_string(), status: ImportStatus::Failed, error: Some(error.to_string()) }
    }
}

/// Per-item outcomes of a batch plus totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    fn push(&mut self, outcome: ImportOutcome) {
        match outcome.status {
            ImportStatus::Created => self.created += 1,
            ImportStatus::Updated => self.updated += 1,
            ImportStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.created + self.updated
    }
}

/// Imports batches through the coordinator's write path.
pub struct ImportPipeline {
    coordinator: Arc<CacheCoordinator>,
    validator: Arc<dyn RecordValidator>,
    chunk_size: usize,
}

impl ImportPipeline {
    pub fn new(coordinator: Arc<CacheCoordinator>, chunk_size: usize) -> Self {
        Self::with_validator(coordinator, Arc::new(RequiredFields), chunk_size)
    }

    pub fn with_validator(
        coordinator: Arc<CacheCoordinator>, validator: Arc<dyn RecordValidator>, chunk_size: usize,
    ) -> Self {
        Self { coordinator, validator, chunk_size: chunk_size.max(1) }
    }

    /// Import `records`, returning one outcome per item in input order.
    ///
    /// Item failures never abort the batch. A chunk the store cannot accept
    /// at all marks its items failed and the next chunk still runs.
    pub async fn import_batch(&self, records: &[CompanyRecord]) -> ImportReport {
        let mut report = ImportReport::default();

        for (chunk_index, chunk) in records.chunks(self.chunk_size).enumerate() {
            let offset = chunk_index * self.chunk_size;
            self.import_chunk(offset, chunk, &mut report).await;
        }

        if report.succeeded() > 0 {
            self.coordinator.invalidate_search().await;
        }

        tracing::info!(
            total = report.total(),
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "import finished"
        );
        report
    }

    async fn import_chunk(&self, offset: usize, chunk: &[CompanyRecord], report: &mut ImportReport) {
        let mut outcomes: Vec<Option<ImportOutcome>> = vec![None; chunk.len()];
        let mut valid = Vec::with_capacity(chunk.len());
        let mut positions = Vec::with_capacity(chunk.len());

        for (i, record) in chunk.iter().enumerate() {
            match self.validator.validate(record) {
                Ok(()) => {
                    valid.push(record.clone());
                    positions.push(i);
                }
                Err(e) => {
                    tracing::debug!(index = offset + i, uid = %record.uid, "rejected import item: {e}");
                    outcomes[i] = Some(ImportOutcome::failed(offset + i, &record.uid, &e));
                }
            }
        }

        if !valid.is_empty() {
            match self.coordinator.write_through_batch(&valid).await {
                Ok(results) => {
                    for ((i, record), result) in positions.iter().zip(&valid).zip(results) {
                        outcomes[*i] = Some(match result {
                            Ok(upserted) => ImportOutcome {
                                index: offset + i,
                                uid: record.uid.clone(),
                                status: upserted.status.into(),
                                error: None,
                            },
                            Err(e) => ImportOutcome::failed(offset + i, &record.uid, &e),
                        });
                    }
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::warn!(offset, size = chunk.len(), "import chunk failed: {e}");
                    } else {
                        tracing::error!(offset, size = chunk.len(), "import chunk rejected: {e}");
                    }
                    for (i, record) in positions.iter().zip(&valid) {
                        outcomes[*i] = Some(ImportOutcome::failed(offset + i, &record.uid, &e));
                    }
                }
            }
        }

        for (i, (outcome, record)) in outcomes.into_iter().zip(chunk).enumerate() {
            let missing = Error::Codec("store returned no outcome".into());
            report.push(outcome.unwrap_or_else(|| ImportOutcome::failed(offset + i, &record.uid, &missing)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::CacheSettings;
    use crate::query::{CanonicalQuery, SearchQuery};
    use crate::record::RecordPage;
    use crate::store::{BatchOutcome, RecordStore, SqliteStore};

    async fn pipeline(chunk_size: usize) -> (SqliteStore, Arc<CacheCoordinator>, ImportPipeline) {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let coordinator = Arc::new(CacheCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(MemoryCache::default()),
            CacheSettings::default(),
        ));
        let pipeline = ImportPipeline::new(Arc::clone(&coordinator), chunk_size);
        (store, coordinator, pipeline)
    }

    fn batch(n: usize) -> Vec<CompanyRecord> {
        (0..n)
            .map(|i| CompanyRecord {
                status: Some("active".into()),
                ..CompanyRecord::new(format!("BG{i:04}"), format!("Company {i}"))
            })
            .collect()
    }

    #[test]
    fn test_required_fields() {
        let v = RequiredFields;
        assert!(v.validate(&CompanyRecord::new("BG1", "Acme")).is_ok());
        assert!(matches!(v.validate(&CompanyRecord::new("", "Acme")), Err(Error::ImportItemInvalid(_))));
        assert!(matches!(v.validate(&CompanyRecord::new("BG 1", "Acme")), Err(Error::ImportItemInvalid(_))));
        assert!(matches!(v.validate(&CompanyRecord::new("BG1", "  ")), Err(Error::ImportItemInvalid(_))));
    }

    #[tokio::test]
    async fn test_invalid_item_fails_alone() {
        let (store, _coordinator, pipeline) = pipeline(3).await;
        let mut records = batch(10);
        records[5].name = String::new();

        let report = pipeline.import_batch(&records).await;
        assert_eq!(report.total(), 10);
        assert_eq!(report.created, 9);
        assert_eq!(report.failed, 1);
        assert_eq!(report.outcomes[5].status, ImportStatus::Failed);
        assert!(report.outcomes[5].error.as_deref().unwrap().contains("IMPORT_ITEM_INVALID"));
        assert!(report.outcomes.iter().enumerate().all(|(i, o)| o.index == i && o.uid == records[i].uid));
        assert_eq!(store.count().await.unwrap(), 9);
        assert!(store.get("BG0005").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replay_is_idempotent() {
        let (store, _coordinator, pipeline) = pipeline(4).await;
        let records = batch(6);

        let first = pipeline.import_batch(&records).await;
        assert_eq!(first.created, 6);
        let before = store.get("BG0003").await.unwrap().unwrap();

        let second = pipeline.import_batch(&records).await;
        assert_eq!(second.updated, 6);
        assert_eq!(second.created, 0);
        assert_eq!(store.count().await.unwrap(), 6);
        assert_eq!(store.get("BG0003").await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_import_clears_search_and_refreshes_records() {
        let (_store, coordinator, pipeline) = pipeline(500).await;
        let query = SearchQuery { name: Some("company".into()), ..Default::default() };
        pipeline.import_batch(&batch(2)).await;
        assert_eq!(coordinator.search(&query).await.unwrap().records.len(), 2);

        let mut update = batch(3);
        update[0].manager = Some("New Manager".into());
        let report = pipeline.import_batch(&update).await;
        assert_eq!((report.created, report.updated), (1, 2));

        assert_eq!(coordinator.search(&query).await.unwrap().records.len(), 3);
        let refreshed = coordinator.lookup_by_uid("BG0000").await.unwrap().unwrap();
        assert_eq!(refreshed.manager.as_deref(), Some("New Manager"));
        assert_eq!(coordinator.stats().store_fetches, 2);
    }

    #[tokio::test]
    async fn test_duplicate_uid_in_batch() {
        let (store, _coordinator, pipeline) = pipeline(500).await;
        let records = vec![CompanyRecord::new("BG1", "First"), CompanyRecord::new("BG1", "Second")];

        let report = pipeline.import_batch(&records).await;
        assert_eq!(report.outcomes[0].status, ImportStatus::Created);
        assert_eq!(report.outcomes[1].status, ImportStatus::Updated);
        assert_eq!(store.get("BG1").await.unwrap().unwrap().name, "Second");
    }

    #[tokio::test]
    async fn test_import_replaces_cached_tombstone() {
        let (_store, coordinator, pipeline) = pipeline(500).await;
        assert!(coordinator.lookup_by_uid("BG0001").await.unwrap().is_none());
        assert!(coordinator.lookup_by_uid("BG0001").await.unwrap().is_none());
        assert_eq!(coordinator.stats().store_fetches, 1);

        let report = pipeline.import_batch(&batch(2)).await;
        assert_eq!(report.created, 2);

        let found = coordinator.lookup_by_uid("BG0001").await.unwrap().unwrap();
        assert_eq!(found.name, "Company 1");
        assert_eq!(coordinator.stats().store_fetches, 1);
    }

    /// Store whose batch writes always fail with the given error.
    struct RejectingStore {
        inner: SqliteStore,
        error: Error,
    }

    #[async_trait::async_trait]
    impl RecordStore for RejectingStore {
        async fn get(&self, uid: &str) -> Result<Option<CompanyRecord>, Error> {
            self.inner.get(uid).await
        }
        async fn query(&self, query: &CanonicalQuery) -> Result<RecordPage, Error> {
            self.inner.query(query).await
        }
        async fn upsert_batch(&self, _records: &[CompanyRecord]) -> Result<BatchOutcome, Error> {
            Err(self.error.clone())
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

    #[tokio::test]
    async fn test_chunk_failure_reports_every_item() {
        for error in [Error::FetchAborted("upsert".into()), Error::ConstraintViolation("uid".into())] {
            let expected = error.to_string();
            let store = RejectingStore { inner: SqliteStore::open_in_memory().await.unwrap(), error };
            let coordinator =
                Arc::new(CacheCoordinator::new(Arc::new(store), Arc::new(MemoryCache::default()), CacheSettings::default()));
            let pipeline = ImportPipeline::new(coordinator, 2);

            let mut records = batch(3);
            records[1].name = String::new();
            let report = pipeline.import_batch(&records).await;

            assert_eq!(report.failed, 3);
            assert!(report.outcomes[1].error.as_deref().unwrap().contains("IMPORT_ITEM_INVALID"));
            assert_eq!(report.outcomes[0].error.as_deref(), Some(expected.as_str()));
            assert_eq!(report.outcomes[2].error.as_deref(), Some(expected.as_str()));
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (_store, _coordinator, pipeline) = pipeline(10).await;
        let report = pipeline.import_batch(&[]).await;
        assert_eq!(report, ImportReport::default());
    }
}
