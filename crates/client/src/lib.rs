//! Network client for shellkeep.
//!
//! This crate provides the reqwest-backed implementation of the engine's
//! [`Network`](shellkeep_core::Network) port.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, response_kind};
