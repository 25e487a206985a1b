//! Lifecycle tools: sw_install, sw_activate, sw_message, sw_context, sw_status.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellkeep_core::host::Activation;
use shellkeep_core::{CacheStorage, Network, WorkerHost};

use super::json_result;
use crate::error::ToolError;

/// Parameters for tools that take none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoParams {}

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageParams {
    /// The posted message, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

/// What happens to a controlled context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContextAction {
    Open,
    Close,
}

/// Parameters for the sw_context tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContextParams {
    pub action: ContextAction,
    /// Context (tab) identifier.
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
struct ContextOutput {
    id: String,
    action: ContextAction,
    controller: Option<String>,
    activation: Option<Activation>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl<S: CacheStorage, N: Network>(host: &WorkerHost<S, N>) -> Result<CallToolResult, McpError> {
    let outcome = host.install().await?;
    json_result(&outcome)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl<S: CacheStorage, N: Network>(host: &WorkerHost<S, N>) -> Result<CallToolResult, McpError> {
    let activation = host.activate().await?;
    json_result(&activation)
}

/// Implementation of the sw_message tool.
pub async fn message_impl<S: CacheStorage, N: Network>(
    host: &WorkerHost<S, N>, params: MessageParams,
) -> Result<CallToolResult, McpError> {
    let outcome = host.message(&params.message).await?;
    json_result(&outcome)
}

/// Implementation of the sw_context tool.
pub async fn context_impl<S: CacheStorage, N: Network>(
    host: &WorkerHost<S, N>, params: ContextParams,
) -> Result<CallToolResult, McpError> {
    let id = params.id.trim();
    if id.is_empty() {
        return Err(ToolError::InvalidInput("id cannot be empty".into()).into());
    }

    let activation = match params.action {
        ContextAction::Open => {
            host.open_context(id).await;
            None
        }
        ContextAction::Close => host.close_context(id).await?,
    };

    let controller = host
        .status()
        .await
        .registration
        .controller_of(id)
        .map(str::to_string);

    json_result(&ContextOutput { id: id.to_string(), action: params.action, controller, activation })
}

/// Implementation of the sw_status tool.
pub async fn status_impl<S: CacheStorage, N: Network>(host: &WorkerHost<S, N>) -> Result<CallToolResult, McpError> {
    json_result(&host.status().await)
}
