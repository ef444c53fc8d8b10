//! Durable record store.
//!
//! [`RecordStore`] is the only interface the rest of the crate uses to reach
//! the relational store. It owns no caching logic; the coordinator, the
//! import pipeline and the export stream layer their policies on top of it.

pub mod sqlite;

use crate::Error;
use crate::db::MigrationSet;
use crate::query::CanonicalQuery;
use crate::record::{CompanyRecord, RecordPage, Upserted};

pub use sqlite::SqliteStore;

/// Schema of the `companies` table.
pub static SCHEMA: MigrationSet = MigrationSet {
    table: "_store_migrations",
    steps: &[
        (1, include_str!("../../migrations/store/001_companies.sql")),
        (2, include_str!("../../migrations/store/002_company_indexes.sql")),
        (3, include_str!("../../migrations/store/003_folded_search_columns.sql")),
    ],
};

/// Outcome of each item of an [`RecordStore::upsert_batch`] call, in input order.
pub type BatchOutcome = Vec<Result<Upserted, Error>>;

/// Uniform interface over the durable store.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Point lookup by uid.
    async fn get(&self, uid: &str) -> Result<Option<CompanyRecord>, Error>;

    /// One page of records matching `query`, ordered by name then uid.
    async fn query(&self, query: &CanonicalQuery) -> Result<RecordPage, Error>;

    /// Upsert each record independently, keyed by uid.
    ///
    /// The outer error means nothing from the batch was persisted; inner
    /// errors reject only their own item.
    async fn upsert_batch(&self, records: &[CompanyRecord]) -> Result<BatchOutcome, Error>;

    /// One page of all records in uid order, resuming after `cursor`.
    async fn scan(&self, cursor: Option<&str>, limit: usize) -> Result<RecordPage, Error>;

    /// Remove a record. Returns whether a row existed.
    async fn delete(&self, uid: &str) -> Result<bool, Error>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), Error>;

    /// Upsert a single record.
    async fn upsert(&self, record: &CompanyRecord) -> Result<Upserted, Error> {
        self.upsert_batch(std::slice::from_ref(record))
            .await?
            .into_iter()
            .next()
            .unwrap_or_else(|| Err(Error::Codec("store returned no outcome for upsert".into())))
    }
}
