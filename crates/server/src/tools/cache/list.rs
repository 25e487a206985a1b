//! cache_list tool implementation.
//!
//! Lists every store with its entry count, flagging the current one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellkeep_core::{CacheStorage, Network, WorkerHost};

use crate::tools::json_result;

/// One store in the cache_list output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: usize,
    /// Whether this store belongs to the hosted generation.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl<S: CacheStorage, N: Network>(host: &WorkerHost<S, N>) -> Result<CallToolResult, McpError> {
    let engine = host.engine();
    let store = engine.store();

    let mut stores = Vec::new();
    for name in store.keys().await? {
        let entries = store.entry_keys(&name).await?.len();
        let current = name == engine.version();
        stores.push(StoreSummary { name, entries, current });
    }

    json_result(&CacheListOutput { stores })
}
