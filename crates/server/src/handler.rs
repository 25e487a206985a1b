//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! worker host. Each tool is one runtime event or store inspection.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, get_impl, list_impl};
use crate::tools::lifecycle::{activate_impl, context_impl, install_impl, message_impl, status_impl};
use crate::tools::{ContextParams, MessageParams, NoParams, SwFetchParams, sw_fetch::fetch_impl};

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
use shellkeep_client::FetchClient;
use shellkeep_core::{CacheDb, WorkerHost};

/// Worker host as wired by the binary.
pub type Host = WorkerHost<CacheDb, FetchClient>;

/// The main MCP server handler for shellkeep.
#[derive(Clone)]
pub struct ShellkeepServer {
    host: Arc<Host>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShellkeepServer {
    /// Create a new server handler around a worker host.
    pub fn new(host: Arc<Host>) -> Self {
        Self { host, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install event: provision the current store from the manifest, then hand over if allowed.")]
    async fn sw_install(&self, _params: Parameters<NoParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.host).await
    }

    #[tool(description = "Activate event: delete stale stores and take control if the installed generation may.")]
    async fn sw_activate(&self, _params: Parameters<NoParams>) -> Result<CallToolResult, McpError> {
        activate_impl(&self.host).await
    }

    /// Route a request through the caching policy.
    ///
    /// Bypassed hosts and uncontrolled contexts go straight to the network.
    #[tool(
        description = "Fetch event: route a URL through the caching policy. Returns the response and where it came from."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    #[tool(description = "Message event from a controlled context. {\"type\": \"SKIP_WAITING\"} forces takeover.")]
    async fn sw_message(&self, params: Parameters<MessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.host, params.0).await
    }

    #[tool(description = "Open or close a controlled context (tab).")]
    async fn sw_context(&self, params: Parameters<ContextParams>) -> Result<CallToolResult, McpError> {
        context_impl(&self.host, params.0).await
    }

    #[tool(description = "Show the active and waiting generations and which contexts they control.")]
    async fn sw_status(&self, _params: Parameters<NoParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.host).await
    }

    #[tool(description = "List stores with their entry counts.")]
    async fn cache_list(&self, _params: Parameters<NoParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.host).await
    }

    #[tool(description = "Read a stored entry by URL without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.host, params.0).await
    }
}

impl ServerHandler for ShellkeepServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellkeep".into(),
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
