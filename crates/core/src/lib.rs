//! Core of the company register: record storage, cache coordination,
//! bulk import and export.
//!
//! This crate provides:
//! - A SQLite record store behind the [`store::RecordStore`] trait
//! - In-memory and SQLite cache backends behind [`cache::CacheAdapter`]
//! - The [`CacheCoordinator`] with single-flight, negative caching and write-through
//! - The bulk [`ImportPipeline`] and the cursor-based [`ExportStream`]
//! - Unified error types and layered configuration

pub mod cache;
pub mod config;
pub mod coordinator;
mod cursor;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod query;
pub mod record;
pub mod service;
pub mod store;

pub use config::{AppConfig, CacheSettings, ConfigError};
pub use coordinator::{CacheCoordinator, CoordinatorStats, HealthReport};
pub use error::Error;
pub use export::ExportStream;
pub use import::{ImportOutcome, ImportPipeline, ImportReport, ImportStatus, RecordValidator, RequiredFields};
pub use query::{SearchLimits, SearchQuery};
pub use record::{CompanyRecord, RecordPage, WriteStatus};
pub use service::Registry;
