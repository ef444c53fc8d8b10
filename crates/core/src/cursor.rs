//! Opaque keyset cursors.
//!
//! A cursor records the sort key of the last row handed out, hex-encoded so
//! callers treat it as an opaque token. Pages resume strictly after that key,
//! which keeps pagination stable while rows are inserted or deleted.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::Error;

/// Resume point for search pages ordered by `(name, uid)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SearchPosition {
    pub name: String,
    pub uid: String,
}

/// Resume point for export scans ordered by `uid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ScanPosition {
    pub uid: String,
}

pub(crate) fn encode<T: Serialize>(position: &T) -> Result<String, Error> {
    Ok(hex::encode(serde_json::to_vec(position)?))
}

pub(crate) fn decode<T: DeserializeOwned>(cursor: &str) -> Result<T, Error> {
    let bytes = hex::decode(cursor).map_err(|_| Error::InvalidCursor)?;
    serde_json::from_slice(&bytes).map_err(|_| Error::InvalidCursor)
}
