//! Request classification.
//!
//! Sorts an intercepted request into a routing class before a strategy is
//! chosen. Rules are applied in priority order:
//!
//! 1. Non-GET methods are not intercepted.
//! 2. Non-http(s) schemes are not intercepted.
//! 3. Hosts containing a database host substring are remote database calls.
//! 4. Static extensions and static CDN hosts are static assets.
//! 5. Requests accepting HTML are navigations.
//! 6. Everything else is `Other`.

use serde::{Deserialize, Serialize};

use crate::config::RoutingConfig;
use crate::request::ProxyRequest;

/// The category a request is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingClass {
    StaticAsset,
    RemoteDatabaseCall,
    HtmlNavigation,
    Other,
}

/// How a routing class is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    NetworkOnly,
}

impl RoutingClass {
    pub fn strategy(self) -> Strategy {
        match self {
            RoutingClass::StaticAsset | RoutingClass::Other => Strategy::CacheFirst,
            RoutingClass::HtmlNavigation => Strategy::NetworkFirst,
            RoutingClass::RemoteDatabaseCall => Strategy::NetworkOnly,
        }
    }
}

/// Pure classifier built from the routing configuration.
#[derive(Debug, Clone)]
pub struct AssetClassifier {
    static_extensions: Vec<String>,
    static_hosts: Vec<String>,
    database_hosts: Vec<String>,
}

impl AssetClassifier {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            static_extensions: config.static_extensions.clone(),
            static_hosts: config.static_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            database_hosts: config.database_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
        }
    }

    /// Classify a request, or `None` when it must pass through untouched.
    pub fn classify(&self, request: &ProxyRequest) -> Option<RoutingClass> {
        if !request.is_get() {
            return None;
        }

        let url = &request.url;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let host = url.host_str().unwrap_or("").to_ascii_lowercase();

        if self.is_database_host(&host) {
            return Some(RoutingClass::RemoteDatabaseCall);
        }

        if self.is_static(url.path(), &host) {
            return Some(RoutingClass::StaticAsset);
        }

        if request.accepts_html() {
            return Some(RoutingClass::HtmlNavigation);
        }

        Some(RoutingClass::Other)
    }

    pub fn is_database_host(&self, host: &str) -> bool {
        self.database_hosts.iter().any(|db| host.contains(db.as_str()))
    }

    fn is_static(&self, path: &str, host: &str) -> bool {
        self.static_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
            || self.static_hosts.iter().any(|h| h == host)
    }
}

impl Default for AssetClassifier {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}
