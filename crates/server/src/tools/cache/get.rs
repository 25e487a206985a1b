//! cache_get tool implementation.
//!
//! Reads one entry of the current store without going to the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellkeep_core::location::{request_key, resolve};
use shellkeep_core::{CacheStorage, Error, Network, WorkerHost};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// Store to read (default: the hosted generation's store).
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub key: String,
    pub status: u16,
    pub kind: String,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    pub body: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl<S: CacheStorage, N: Network>(
    host: &WorkerHost<S, N>, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let engine = host.engine();
    let url = resolve(&params.url, &engine.config().origin).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    let key = request_key(&url);
    let store = params.store.unwrap_or_else(|| engine.version().to_string());

    let response = engine
        .store()
        .match_entry(&store, &key)
        .await?
        .ok_or_else(|| Error::NoCachedResponse(format!("{key} not in {store}")))?;

    json_result(&CacheGetOutput {
        store,
        key,
        status: response.status,
        kind: response.kind.as_str().to_string(),
        body_len: response.body.len(),
        body: std::str::from_utf8(&response.body).ok().map(str::to_string),
        headers: response.headers,
    })
}
