//! company_search tool implementation.
//!
//! Runs a filtered, paginated search. Pages are cached briefly and dropped
//! whenever any record changes.

use beacon_core::{RecordPage, Registry, SearchQuery};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Parameters for the company_search tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompanySearchParams {
    #[serde(flatten)]
    pub query: SearchQuery,
}

/// Implementation of the company_search tool.
pub async fn search_impl(registry: &Registry, params: CompanySearchParams) -> Result<CallToolResult, McpError> {
    let page: RecordPage = registry.search(&params.query).await?;
    json_result(&page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{parse_output, testing};

    #[tokio::test]
    async fn test_search_pages_through_results() {
        let registry = testing::registry().await;
        let records: Vec<_> = (0..5).map(|i| testing::company(&format!("BG{i}"), &format!("Acme {i}"))).collect();
        registry.import_batch(&records).await;

        let params: CompanySearchParams = serde_json::from_str(r#"{"name": "acme", "limit": 3}"#).unwrap();
        let first: RecordPage = parse_output(&search_impl(&registry, params).await.unwrap());
        assert_eq!(first.records.len(), 3);

        let params = CompanySearchParams {
            query: SearchQuery { name: Some("acme".into()), limit: Some(3), cursor: first.next_cursor, ..Default::default() },
        };
        let second: RecordPage = parse_output(&search_impl(&registry, params).await.unwrap());
        assert_eq!(second.records.len(), 2);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_search_bad_cursor() {
        let registry = testing::registry().await;
        let params = CompanySearchParams {
            query: SearchQuery { cursor: Some("zz".into()), ..Default::default() },
        };
        let err = search_impl(&registry, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
