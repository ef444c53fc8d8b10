//! cache_purge tool implementation.
//!
//! Drops expired cache entries, or flushes both cache namespaces.

use beacon_core::Registry;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Also delete live record and search entries.
    #[serde(default)]
    pub flush: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(registry: &Registry, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let mut deleted = registry.purge_expired().await?;
    if params.flush {
        deleted += registry.flush().await?;
    }

    tracing::info!(deleted, flush = params.flush, "purged cache");
    json_result(&CachePurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{parse_output, testing};

    #[tokio::test]
    async fn test_purge_keeps_live_entries() {
        let registry = testing::registry().await;
        registry.import_batch(&[testing::company("BG1", "Acme")]).await;

        let output: CachePurgeOutput = parse_output(&purge_impl(&registry, CachePurgeParams::default()).await.unwrap());
        assert_eq!(output.deleted, 0);

        registry.lookup_by_uid("BG1").await.unwrap();
        assert_eq!(registry.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_flush_empties_cache() {
        let registry = testing::registry().await;
        registry.import_batch(&[testing::company("BG1", "Acme")]).await;

        let output: CachePurgeOutput = parse_output(&purge_impl(&registry, CachePurgeParams { flush: true }).await.unwrap());
        assert_eq!(output.deleted, 1);

        registry.lookup_by_uid("BG1").await.unwrap();
        assert_eq!(registry.stats().hits, 0);
        assert_eq!(registry.stats().store_fetches, 1);
    }
}
