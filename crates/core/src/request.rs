//! Intercepted requests and the response snapshots stored for them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Body of the response synthesized for database calls made while offline.
pub const OFFLINE_ERROR_BODY: &str = r#"{"error":"Offline"}"#;

/// A request intercepted from the host application.
///
/// Header names are stored lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub method: String,
    pub url: Url,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ProxyRequest {
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self { method: method.into(), url, headers: BTreeMap::new() }
    }

    /// Build a GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// Add a header, replacing any previous value for the same name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether the Accept header asks for an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }

}

/// Immutable capture of a response at the moment it was fetched or stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// Final URL of the response.
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
    /// RFC 3339 timestamp, set once the snapshot has been persisted.
    #[serde(default)]
    pub stored_at: Option<String>,
}

impl ResponseSnapshot {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { url: url.into(), status, headers: BTreeMap::new(), body: body.into(), stored_at: None }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// The structured error returned for database calls while offline.
    pub fn offline_error(url: &Url) -> Self {
        Self::new(url.as_str(), 200, OFFLINE_ERROR_BODY).with_header("content-type", "application/json")
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}
