//! MCP tool implementations.
//!
//! This module contains all tools exposed by the beacon server. Each tool
//! takes the shared [`beacon_core::Registry`] and returns its output as
//! pretty-printed JSON text.

pub mod cache;
pub mod company;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub use cache::{CachePurgeParams, CacheStatsParams};
pub use company::{CompanyExportParams, CompanyGetParams, CompanyImportParams, CompanySearchParams};

/// Serialize a tool output into a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(beacon_core::Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Parse the JSON text a tool returned.
#[cfg(test)]
pub(crate) fn parse_output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
