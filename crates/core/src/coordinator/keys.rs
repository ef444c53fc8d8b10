//! Namespaced cache keys.

use sha2::{Digest, Sha256};

use crate::query::CanonicalQuery;

/// Hash a canonical query and its page cursor into a search key suffix.
pub fn compute_search_hash(canonical_json: &str, cursor: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json.as_bytes());
    hasher.update(b"\n");
    hasher.update(cursor.unwrap_or_default().as_bytes());
    hex::encode(hasher.finalize())
}

/// Builds `record:<uid>` and `search:<hash>` keys from configured prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    record_prefix: String,
    search_prefix: String,
}

impl KeySpace {
    pub fn new(record_prefix: impl Into<String>, search_prefix: impl Into<String>) -> Self {
        Self { record_prefix: record_prefix.into(), search_prefix: search_prefix.into() }
    }

    pub fn record(&self, uid: &str) -> String {
        format!("{}{uid}", self.record_prefix)
    }

    pub fn search(&self, query: &CanonicalQuery) -> String {
        format!("{}{}", self.search_prefix, compute_search_hash(&query.canonical_json(), query.cursor.as_deref()))
    }

    pub fn search_prefix(&self) -> &str {
        &self.search_prefix
    }

    pub fn record_prefix(&self) -> &str {
        &self.record_prefix
    }
}
