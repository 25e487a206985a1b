//! Network port used by the engine.

use async_trait::async_trait;

use crate::Error;
use crate::request::FetchRequest;
use crate::response::ResponseSnapshot;

/// Performs live fetches on behalf of the engine.
///
/// Any HTTP status (including 4xx/5xx) is a successful fetch. Only transport
/// failures return `Err`, and those are what trigger offline fallbacks.
#[async_trait]
pub trait Network: Send + Sync + 'static {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResponseSnapshot, Error>;
}
