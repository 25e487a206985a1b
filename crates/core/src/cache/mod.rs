//! Named response stores.
//!
//! The engine talks to stores through the [`CacheStorage`] port. [`CacheDb`]
//! is the persistent implementation: SQLite through tokio-rusqlite, with
//!
//! - one row per store name, entries cascading on delete
//! - entries keyed by a SHA-256 of (store, request URL)
//! - body digests checked on read, so damaged rows read as misses
//! - WAL mode for concurrent readers during background writes

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use storage::CacheStorage;
