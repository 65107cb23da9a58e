//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker's lifecycle signals.
use std::sync::Arc;

use crate::tools::{
    cache::{CacheKeysParams, CachePrimeParams, keys_impl, prime_impl},
    fetch::{SwFetchParams, fetch_impl},
    lifecycle::{SwInstallParams, activate_impl, install_impl},
    message::{SwMessageParams, message_impl},
    status::status_impl,
};

use menucache_client::OfflineProxy;
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

/// The MCP server handler for menucache-sw.
#[derive(Clone)]
pub struct ProxyServer {
    proxy: Arc<OfflineProxy>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// Every tool awaits the worker before replying, so the caller observes the
/// lifecycle work as finished.
#[tool_router]
impl ProxyServer {
    /// Create a new server handler around a worker.
    pub fn new(proxy: Arc<OfflineProxy>) -> Self {
        Self { proxy, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Install the worker: fetch the asset manifest into the static cache. Activates immediately when skip-waiting was requested, unless honor_skip_waiting is false."
    )]
    async fn sw_install(&self, params: Parameters<SwInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Activate the worker: delete stale cache partitions and take control of clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.proxy).await
    }

    /// Serve one intercepted request.
    #[tool(
        description = "Intercept a request. Returns the response with its source (network, cache, fallback, offline_data, synthesized), or {\"intercepted\": false} for pass-through."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Post a control message to the worker. Types: skipWaiting, clearCache.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Report lifecycle state, client control, pending revalidations, and cache partitions.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.proxy).await
    }

    #[tool(description = "List cached entry URLs per partition, optionally for a single partition id.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Store the offline menu snapshot served to menu database calls while offline.")]
    async fn cache_prime(&self, params: Parameters<CachePrimeParams>) -> Result<CallToolResult, McpError> {
        prime_impl(&self.proxy, params.0).await
    }
}

impl ServerHandler for ProxyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "menucache-sw".into(),
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
