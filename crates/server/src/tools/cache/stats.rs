//! cache_stats tool implementation.

use beacon_core::{CoordinatorStats, HealthReport, Registry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Parameters for the cache_stats tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsParams {
    /// Ping the store and cache backends as well.
    #[serde(default)]
    pub health: bool,
}

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsOutput {
    pub stats: CoordinatorStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthReport>,
}

/// Implementation of the cache_stats tool.
pub async fn stats_impl(registry: &Registry, params: CacheStatsParams) -> Result<CallToolResult, McpError> {
    let health = if params.health { Some(registry.health_check().await) } else { None };
    json_result(&CacheStatsOutput { stats: registry.stats(), health })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{parse_output, testing};

    #[tokio::test]
    async fn test_stats_count_lookups() {
        let registry = testing::registry().await;
        registry.lookup_by_uid("BG404").await.unwrap();
        registry.lookup_by_uid("BG404").await.unwrap();

        let output: CacheStatsOutput = parse_output(&stats_impl(&registry, CacheStatsParams { health: true }).await.unwrap());
        assert_eq!(output.stats.misses, 1);
        assert_eq!(output.stats.negative_hits, 1);
        assert_eq!(output.health, Some(HealthReport { store: true, cache: true }));
    }
}
