//! company_get tool implementation.
//!
//! Looks a company up by uid through the cache.

use beacon_core::{CompanyRecord, Registry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Parameters for the company_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompanyGetParams {
    /// Unified identification code of the company.
    pub uid: String,
}

/// Output from the company_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompanyGetOutput {
    pub company: CompanyRecord,
}

/// Implementation of the company_get tool.
pub async fn get_impl(registry: &Registry, params: CompanyGetParams) -> Result<CallToolResult, McpError> {
    let company = registry.get_company(&params.uid).await?;
    json_result(&CompanyGetOutput { company })
}
