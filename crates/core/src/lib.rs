//! Core types and the cache policy engine for shellkeep.
//!
//! This crate provides:
//! - The cache policy engine (provisioning, generation management, routing, control)
//! - A lifecycle host that applies the engine's handover transitions
//! - Store and network ports, with a SQLite-backed store
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod location;
pub mod network;
pub mod request;
pub mod response;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheDb, CacheStorage};
pub use config::{AppConfig, ConfigError};
pub use engine::{CachePolicyEngine, EngineConfig, Routed, Served, ServedFrom};
pub use error::Error;
pub use host::WorkerHost;
pub use network::Network;
pub use request::{Destination, FetchRequest};
pub use response::{ResponseKind, ResponseSnapshot};
