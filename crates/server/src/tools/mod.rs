//! MCP tool implementations.
//!
//! Each tool delivers one runtime event to the worker host, or inspects the
//! stores it manages.

pub mod cache;
pub mod lifecycle;
pub mod sw_fetch;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use lifecycle::{ContextParams, MessageParams, NoParams};
pub use sw_fetch::{SwFetchOutput, SwFetchParams};

/// Encode a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::OutputFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
