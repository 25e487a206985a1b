//! Host-based request classification.

use std::collections::HashSet;

use serde::Serialize;
use url::Url;

/// Strategy applied to an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Not intercepted; the request goes through normal network handling.
    Bypass,
    /// Live fetch first, stored copy when the network fails.
    NetworkFirst,
    /// Stored copy first, live fetch (and populate) on a miss.
    CacheFirst,
}

/// The two fixed host sets that pick a strategy.
#[derive(Debug, Clone, Default)]
pub struct HostRules {
    bypass: HashSet<String>,
    network_first: HashSet<String>,
}

impl HostRules {
    pub fn new<B, N>(bypass: B, network_first: N) -> Self
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Self {
            bypass: bypass.into_iter().map(|h| h.as_ref().to_lowercase()).collect(),
            network_first: network_first.into_iter().map(|h| h.as_ref().to_lowercase()).collect(),
        }
    }

    /// Classify by exact (lowercased) host; bypass wins over network-first.
    pub fn classify(&self, url: &Url) -> RouteClass {
        let Some(host) = url.host_str() else {
            return RouteClass::CacheFirst;
        };
        let host = host.to_lowercase();

        if self.bypass.contains(&host) {
            RouteClass::Bypass
        } else if self.network_first.contains(&host) {
            RouteClass::NetworkFirst
        } else {
            RouteClass::CacheFirst
        }
    }
}
