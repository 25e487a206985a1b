//! Intercepted request model.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::location::{UrlError, resolve};

/// What the requesting context intends to do with the response.
///
/// Only [`Destination::Document`] counts as a top-level navigation, which is
/// the one case eligible for the offline fallback document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Font,
    Image,
    Manifest,
    #[default]
    #[serde(alias = "")]
    Empty,
}

/// An outbound request intercepted from a controlled context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub method: String,
    pub destination: Destination,
}

impl FetchRequest {
    /// A plain `GET` subresource request.
    pub fn get(url: Url) -> Self {
        Self { url, method: "GET".to_string(), destination: Destination::Empty }
    }

    /// Resolve `input` against `origin` and build a `GET` request for it.
    pub fn parse(input: &str, origin: &Url) -> Result<Self, UrlError> {
        Ok(Self::get(resolve(input, origin)?))
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_uppercase();
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }

    /// Stores only hold `GET` entries; other methods skip lookup and writes.
    pub fn is_cacheable_method(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}
