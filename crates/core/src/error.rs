//! Unified error types for the register core.
//!
//! Every variant is cheap to clone so that a single-flight fetch can hand the
//! exact same outcome to all of its waiters.

use std::sync::Arc;

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the register core.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty uid).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No record exists for the given uid.
    #[error("RECORD_NOT_FOUND: {0}")]
    RecordNotFound(String),

    /// The durable store could not complete the operation.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(Arc<tokio_rusqlite::Error>),

    /// A shared fetch ended without publishing a result.
    #[error("STORE_UNAVAILABLE: fetch for {0} aborted")]
    FetchAborted(String),

    /// The cache backend could not complete the operation.
    #[error("CACHE_UNAVAILABLE: {0}")]
    CacheUnavailable(String),

    /// An import item was rejected before reaching the store.
    #[error("IMPORT_ITEM_INVALID: {0}")]
    ImportItemInvalid(String),

    /// The store rejected a row (unique, not-null or check constraint).
    #[error("CONSTRAINT_VIOLATION: {0}")]
    ConstraintViolation(String),

    /// Migration failed to apply.
    #[error("STORE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// A pagination cursor could not be decoded.
    #[error("INVALID_CURSOR")]
    InvalidCursor,

    /// A cached or stored payload could not be encoded or decoded.
    #[error("CODEC_ERROR: {0}")]
    Codec(String),
}

impl Error {
    /// Whether the failure is transient backend trouble rather than bad input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::FetchAborted(_) | Error::CacheUnavailable(_))
    }

    /// Re-label database failures raised by a cache backend.
    ///
    /// Cache backends share the SQLite plumbing with the store, so their
    /// connection errors arrive as `StoreUnavailable` and must be reported
    /// as cache trouble instead.
    pub(crate) fn into_cache_error(self) -> Self {
        match self {
            Error::StoreUnavailable(e) => Error::CacheUnavailable(e.to_string()),
            Error::ConstraintViolation(msg) | Error::MigrationFailed(msg) => Error::CacheUnavailable(msg),
            other => other,
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => {
                Error::StoreUnavailable(Arc::new(tokio_rusqlite::Error::ConnectionClosed))
            }
            tokio_rusqlite::Error::Close(c) => Error::StoreUnavailable(Arc::new(tokio_rusqlite::Error::Close(c))),
            _ => Error::StoreUnavailable(Arc::new(tokio_rusqlite::Error::ConnectionClosed)),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e.into(),
            other => Error::StoreUnavailable(Arc::new(other)),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, _) = &err
            && failure.code == rusqlite::ErrorCode::ConstraintViolation
        {
            return Error::ConstraintViolation(err.to_string());
        }
        Error::StoreUnavailable(Arc::new(tokio_rusqlite::Error::Error(err)))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Codec(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidCursor => (-32602, "Invalid pagination cursor".to_string()),
            Error::RecordNotFound(uid) => (-32001, format!("Company with UID {uid} not found")),
            Error::StoreUnavailable(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::FetchAborted(key) => (-32002, format!("fetch for {key} aborted")),
            Error::CacheUnavailable(msg) => (-32003, msg.clone()),
            Error::ImportItemInvalid(msg) => (-32004, msg.clone()),
            Error::ConstraintViolation(msg) => (-32005, msg.clone()),
            Error::Codec(msg) => (-32000, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
