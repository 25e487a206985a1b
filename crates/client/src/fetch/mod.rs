//! HTTP fetch pipeline implementing the engine's network port.
//!
//! ### Semantics
//! - Any HTTP status is a response; only transport failures are errors.
//! - Redirects are followed (max 5 by default); the snapshot records the final URL.
//! - Bodies are fully read (bounded by `max_bytes`) so the snapshot can be duplicated.
//!
//! ### Tainting
//! - Responses are tagged `basic`, `cors` or `opaque` relative to the app origin.

pub mod tainting;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use url::Url;

pub use tainting::response_kind;

use shellkeep_core::location::parse_origin;
use shellkeep_core::{AppConfig, Destination, Error, FetchRequest, Network, ResponseSnapshot};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Application origin; requests are made on its behalf.
    pub origin: Url,

    /// User agent string (default: "shellkeep/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Build from the application configuration.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            origin: parse_origin(&config.origin)?,
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        })
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("http://localhost:8080").expect("static origin parses"),
            user_agent: "shellkeep/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// `Accept` header a browser would send for each destination.
fn accept_for(destination: Destination) -> &'static str {
    match destination {
        Destination::Document => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        Destination::Style => "text/css,*/*;q=0.1",
        Destination::Image => "image/avif,image/webp,image/png,image/*;q=0.8,*/*;q=0.5",
        Destination::Manifest => "application/manifest+json,application/json;q=0.9,*/*;q=0.8",
        Destination::Script | Destination::Font | Destination::Empty => "*/*",
    }
}

/// `Origin` header value, sent only on cross-origin requests whose method is
/// not `GET` or `HEAD`.
fn origin_header(origin: &Url, request: &FetchRequest) -> Option<String> {
    let safe = matches!(request.method.as_str(), "GET" | "HEAD");
    (!safe && request.url.origin() != origin.origin()).then(|| origin.origin().ascii_serialization())
}

fn map_send_error(url: &Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

/// HTTP client that produces materialized response snapshots.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Perform `request` over the network and read the whole body.
    pub async fn execute(&self, request: &FetchRequest) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();
        let url = &request.url;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let mut builder = self
            .http
            .request(method, url.as_str())
            .header(header::ACCEPT, accept_for(request.destination));
        if let Some(origin) = origin_header(&self.config.origin, request) {
            builder = builder.header(header::ORIGIN, origin);
        }

        let response = builder.send().await.map_err(|e| map_send_error(url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{url}: {len} bytes exceeds {}", self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        let kind = response_kind(
            &self.config.origin,
            &final_url,
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
        );

        let body = response.bytes().await.map_err(|e| map_send_error(url, e))?;
        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{url}: {} bytes exceeds {}",
                body.len(),
                self.config.max_bytes
            )));
        }

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes, {})",
            url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len(),
            kind.as_str()
        );

        Ok(ResponseSnapshot {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            kind,
            headers,
            body,
        })
    }

}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResponseSnapshot, Error> {
        self.execute(request).await
    }
}
