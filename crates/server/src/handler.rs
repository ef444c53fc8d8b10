//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use beacon_core::Registry;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::{cache, company};
use crate::tools::{
    CachePurgeParams, CacheStatsParams, CompanyExportParams, CompanyGetParams, CompanyImportParams,
    CompanySearchParams,
};

/// The main MCP server handler for the company register.
#[derive(Clone)]
pub struct BeaconServer {
    registry: Arc<Registry>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl BeaconServer {
    /// Create a new server handler around an open registry.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry, tool_router: Self::tool_router() }
    }

    #[tool(description = "Look up a company by its unified identification code (UID).")]
    async fn company_get(&self, params: Parameters<CompanyGetParams>) -> Result<CallToolResult, McpError> {
        company::get_impl(&self.registry, params.0).await
    }

    /// Search companies.
    ///
    /// Only active companies are returned unless `include_inactive` is set or an explicit status is given.
    #[tool(
        description = "Search companies by name, UID prefix, status, legal form or region. Returns one page and a cursor for the next."
    )]
    async fn company_search(&self, params: Parameters<CompanySearchParams>) -> Result<CallToolResult, McpError> {
        company::search_impl(&self.registry, params.0).await
    }

    #[tool(description = "Create or update a batch of companies by UID. Reports created, updated or failed per item.")]
    async fn company_import(&self, params: Parameters<CompanyImportParams>) -> Result<CallToolResult, McpError> {
        company::import_impl(&self.registry, params.0).await
    }

    #[tool(description = "Export all companies in UID order, one page per call. Pass the returned cursor to continue.")]
    async fn company_export(&self, params: Parameters<CompanyExportParams>) -> Result<CallToolResult, McpError> {
        company::export_impl(&self.registry, params.0).await
    }

    #[tool(description = "Drop expired cache entries. Set flush to also clear all cached records and searches.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.registry, params.0).await
    }

    #[tool(description = "Report cache hit, miss and coalescing counters, optionally with backend health.")]
    async fn cache_stats(&self, params: Parameters<CacheStatsParams>) -> Result<CallToolResult, McpError> {
        cache::stats_impl(&self.registry, params.0).await
    }
}

impl ServerHandler for BeaconServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "beacon-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
