//! Store port used by the engine.

use async_trait::async_trait;

use crate::Error;
use crate::response::ResponseSnapshot;

/// A set of named, persistent key→response stores.
///
/// Keys are request identities (see [`crate::location::request_key`]).
/// Implementations must tolerate concurrent writes to distinct keys.
#[async_trait]
pub trait CacheStorage: Send + Sync + 'static {
    /// Create the named store if it does not exist yet.
    async fn open(&self, store: &str) -> Result<(), Error>;

    /// Names of all existing stores, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and every entry in it. Returns whether it existed.
    async fn delete(&self, store: &str) -> Result<bool, Error>;

    /// Look up a stored response. Undecodable entries read as `None`.
    async fn match_entry(&self, store: &str, key: &str) -> Result<Option<ResponseSnapshot>, Error>;

    /// Insert or replace an entry, creating the store if needed.
    async fn put(&self, store: &str, key: &str, response: &ResponseSnapshot) -> Result<(), Error>;

    /// Keys stored in the named store, in insertion order.
    async fn entry_keys(&self, store: &str) -> Result<Vec<String>, Error>;
}
