//! Store inspection tools.
//!
//! Read-only views of the stores the worker manages.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
