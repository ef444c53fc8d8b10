//! company_export tool implementation.
//!
//! Returns one page of the full register in uid order, read straight from
//! the store.

use beacon_core::{RecordPage, Registry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Parameters for the company_export tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompanyExportParams {
    /// Cursor returned by the previous page; omit to start from the beginning.
    #[serde(default)]
    pub cursor: Option<String>,

    /// Records per page, capped by the configured export page size.
    #[serde(default)]
    pub page_size: Option<usize>,
}

/// Implementation of the company_export tool.
pub async fn export_impl(registry: &Registry, params: CompanyExportParams) -> Result<CallToolResult, McpError> {
    let page: RecordPage = registry.export_page(params.cursor.as_deref(), params.page_size).await?;
    tracing::info!(records = page.records.len(), last_page = page.next_cursor.is_none(), "exported page");
    json_result(&page)
}
