//! Materialized response snapshots.
//!
//! A [`ResponseSnapshot`] owns its body as shared immutable [`Bytes`], so
//! cloning it yields an independent, re-readable copy. One copy goes back to
//! the requester while another is persisted.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Response tainting as seen by the requesting context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response.
    Basic,
    /// Cross-origin response with CORS access.
    Cors,
    /// Cross-origin response without CORS access.
    Opaque,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseKind::Basic),
            "cors" => Some(ResponseKind::Cors),
            "opaque" => Some(ResponseKind::Opaque),
            _ => None,
        }
    }
}

/// A fully materialized HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// Final URL of the response (after redirects).
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub kind: ResponseKind,
    /// Header name/value pairs in received order.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseSnapshot {
    /// A same-origin `200 OK` response with the given body.
    pub fn ok(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            status_text: "OK".to_string(),
            kind: ResponseKind::Basic,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16, status_text: impl Into<String>) -> Self {
        self.status = status;
        self.status_text = status_text.into();
        self
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Eligible for the cache-first populate path: exactly `200` and same-origin.
    pub fn is_plain_success(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_independent_copy() {
        let original = ResponseSnapshot::ok("https://app.example.com/", "<html></html>");
        let copy = original.clone();
        drop(original);
        assert_eq!(&copy.body[..], b"<html></html>");
    }

    #[test]
    fn test_plain_success() {
        let ok = ResponseSnapshot::ok("https://app.example.com/a.js", "x");
        assert!(ok.is_plain_success());
        assert!(!ok.clone().with_kind(ResponseKind::Opaque).is_plain_success());
        assert!(!ok.clone().with_kind(ResponseKind::Cors).is_plain_success());
        assert!(!ok.with_status(206, "Partial Content").is_plain_success());
    }

    #[test]
    fn test_is_ok_range() {
        let resp = ResponseSnapshot::ok("u", "");
        assert!(resp.clone().with_status(204, "No Content").is_ok());
        assert!(!resp.with_status(404, "Not Found").is_ok());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let resp = ResponseSnapshot::ok("u", "").with_header("Content-Type", "text/html");
        assert_eq!(resp.content_type(), Some("text/html"));
        assert_eq!(resp.header("x-missing"), None);
    }

    #[test]
    fn test_kind_roundtrip_names() {
        for kind in [ResponseKind::Basic, ResponseKind::Cors, ResponseKind::Opaque] {
            assert_eq!(ResponseKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ResponseKind::parse("error"), None);
    }
}
