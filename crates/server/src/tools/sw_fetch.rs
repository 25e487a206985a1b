//! sw_fetch tool implementation.
//!
//! Delivers a fetch event for a URL and reports which strategy answered it.
//! Requests the worker does not intercept go straight to the network.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellkeep_core::{CacheStorage, Destination, FetchRequest, Network, ResponseSnapshot, Routed, WorkerHost};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination; "document" marks a top-level navigation.
    #[serde(default)]
    pub destination: Destination,

    /// Context issuing the request. Without one, the request counts as
    /// controlled once a generation is active.
    #[serde(default)]
    pub context_id: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The request URL after resolution.
    pub url: String,
    /// URL of the response (after redirects, or of the fallback document).
    pub response_url: String,
    /// Routing class: "bypass", "network_first" or "cache_first".
    pub route: String,
    /// "network", "cache", "fallback" or "passthrough".
    pub source: String,
    pub status: u16,
    pub status_text: String,
    /// Response tainting: "basic", "cors" or "opaque".
    pub kind: String,
    pub content_type: Option<String>,
    pub body_len: usize,
    /// Body as UTF-8 text, when it is valid UTF-8.
    pub body: Option<String>,
    /// ISO8601 timestamp of when the response was served.
    pub served_at: String,
}

impl SwFetchOutput {
    fn new(url: &str, route: &str, source: &str, response: &ResponseSnapshot) -> Self {
        Self {
            url: url.to_string(),
            response_url: response.url.clone(),
            route: route.to_string(),
            source: source.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            kind: response.kind.as_str().to_string(),
            content_type: response.content_type().map(str::to_string),
            body_len: response.body.len(),
            body: std::str::from_utf8(&response.body).ok().map(str::to_string),
            served_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

fn label<T: Serialize>(value: T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl<S: CacheStorage, N: Network>(
    host: &WorkerHost<S, N>, params: SwFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(ToolError::InvalidInput("method cannot be empty".into()).into());
    }

    let origin = &host.engine().config().origin;
    let request = FetchRequest::parse(&params.url, origin)
        .map_err(|e| ToolError::InvalidInput(e.to_string()))?
        .with_method(params.method.trim())
        .with_destination(params.destination);

    let output = match host.fetch(params.context_id.as_deref(), &request).await? {
        Routed::Respond(served) => {
            SwFetchOutput::new(request.url.as_str(), &label(served.route), &label(served.source), &served.response)
        }
        Routed::Passthrough => {
            let route = label(host.engine().config().rules.classify(&request.url));
            let response = host.engine().network().fetch(&request).await?;
            SwFetchOutput::new(request.url.as_str(), &route, "passthrough", &response)
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ORIGIN, output_json, test_host};
    use std::sync::atomic::Ordering;

    fn params(url: &str, destination: Destination) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), destination, context_id: None }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let host = test_host().await;
        assert!(fetch_impl(&host, params("", Destination::Empty)).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_before_activation_passes_through() {
        let host = test_host().await;
        let output = output_json(&fetch_impl(&host, params("/index.html", Destination::Empty)).await.unwrap());

        assert_eq!(output["source"], "passthrough");
        assert_eq!(output["route"], "cache_first");
        assert_eq!(output["url"], format!("{ORIGIN}/index.html"));
    }

    #[tokio::test]
    async fn test_fetch_served_from_cache_after_install() {
        let host = test_host().await;
        host.install().await.unwrap();

        let output = output_json(&fetch_impl(&host, params("/index.html", Destination::Empty)).await.unwrap());

        assert_eq!(output["source"], "cache");
        assert_eq!(output["body"], "body of /index.html");
    }

    #[tokio::test]
    async fn test_offline_navigation_fallback() {
        let host = test_host().await;
        host.install().await.unwrap();
        host.engine().network().offline.store(true, Ordering::SeqCst);

        let output = output_json(&fetch_impl(&host, params("/somewhere", Destination::Document)).await.unwrap());

        assert_eq!(output["source"], "fallback");
        assert_eq!(output["response_url"], format!("{ORIGIN}/index.html"));
    }

    #[tokio::test]
    async fn test_offline_subresource_miss_is_error() {
        let host = test_host().await;
        host.install().await.unwrap();
        host.engine().network().offline.store(true, Ordering::SeqCst);

        let err = fetch_impl(&host, params("/missing.js", Destination::Script)).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_bypass_host_goes_to_network() {
        let host = test_host().await;
        host.install().await.unwrap();

        let output = output_json(
            &fetch_impl(&host, params("https://accounts.google.com/o/oauth2", Destination::Empty)).await.unwrap(),
        );

        assert_eq!(output["source"], "passthrough");
        assert_eq!(output["route"], "bypass");
        assert_eq!(output["status"], 404);
    }
}
