//! company_import tool implementation.
//!
//! Upserts a batch of companies and reports the outcome of every item.

use beacon_core::{CompanyRecord, ImportReport, Registry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Parameters for the company_import tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompanyImportParams {
    /// Companies to create or update, keyed by uid.
    pub companies: Vec<CompanyRecord>,
}

/// Implementation of the company_import tool.
pub async fn import_impl(registry: &Registry, params: CompanyImportParams) -> Result<CallToolResult, McpError> {
    let report: ImportReport = registry.import_batch(&params.companies).await;
    json_result(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{parse_output, testing};
    use beacon_core::ImportStatus;

    #[tokio::test]
    async fn test_import_reports_each_item() {
        let registry = testing::registry().await;
        let params: CompanyImportParams = serde_json::from_str(
            r#"{"companies": [
                {"uid": "BG1", "name": "Acme"},
                {"uid": "", "name": "Nameless"},
                {"uid": "BG2", "name": "Globex"}
            ]}"#,
        )
        .unwrap();

        let report: ImportReport = parse_output(&import_impl(&registry, params).await.unwrap());
        assert_eq!((report.created, report.updated, report.failed), (2, 0, 1));
        assert_eq!(report.outcomes[1].status, ImportStatus::Failed);
        assert!(registry.lookup_by_uid("BG2").await.unwrap().is_some());
    }
}
