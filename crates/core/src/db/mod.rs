//! Shared SQLite plumbing for the store and the SQLite cache backend.
//!
//! Both backends run on tokio-rusqlite connections configured with the same
//! pragmas, and each tracks its own schema version in a separate table so
//! they can share one database file.

pub mod connection;
pub mod migrations;

use chrono::{DateTime, SecondsFormat, Utc};

pub use migrations::MigrationSet;

/// Fixed-width RFC 3339 timestamp, so stored values compare lexicographically.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now() -> String {
    timestamp(Utc::now())
}
