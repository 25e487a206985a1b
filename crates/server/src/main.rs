//! shellkeep server entry point.
//!
//! Boots the worker host and serves it as an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellkeep_client::{FetchClient, FetchConfig};
use shellkeep_core::{AppConfig, CacheDb, CachePolicyEngine, EngineConfig, WorkerHost};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening store database {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from_app(&config)?)?;
    let engine = CachePolicyEngine::new(EngineConfig::from_app(&config)?, Arc::new(db), Arc::new(network));
    let host = Arc::new(WorkerHost::new(engine));

    tracing::info!(version = %config.version, origin = %config.origin, "starting shellkeep on stdio transport");

    let server = serve_server(handler::ShellkeepServer::new(Arc::clone(&host)), stdio()).await?;
    server.waiting().await?;

    host.engine().wait_for_writes().await;

    Ok(())
}
