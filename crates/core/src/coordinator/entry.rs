//! Values stored under coordinator-controlled keys.

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::record::{CompanyRecord, RecordPage};

/// Payload of a cache entry; expiry is tracked by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheEntry {
    /// A record as last read from or written to the store.
    Record { record: CompanyRecord },
    /// The store confirmed the uid is absent.
    Tombstone,
    /// One page of search results.
    Page { page: RecordPage },
}

impl CacheEntry {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tombstone_encoding() {
        let bytes = CacheEntry::Tombstone.encode().unwrap();
        assert_eq!(bytes, br#"{"kind":"tombstone"}"#.to_vec());
        assert_eq!(CacheEntry::decode(&bytes).unwrap(), CacheEntry::Tombstone);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(CacheEntry::decode(b"not json"), Err(Error::Codec(_))));
    }
}
