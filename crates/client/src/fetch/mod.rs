//! Network access for the cache proxy.
//!
//! ### Fetcher seam
//! - Strategies only see the `Fetcher` trait, so tests can script the network.
//! - `HttpFetcher` is the reqwest implementation used by the binary.
//!
//! ### Semantics
//! - Any HTTP answer, 2xx or not, is `Ok`; callers decide what to cache.
//! - Transport failures (DNS, refused connection, reset, body read) are
//!   `Error::NetworkUnavailable`, which is what triggers offline fallbacks.
//! - No timeout unless one is configured; a hung fetch only stalls its own request.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use menucache_core::{AppConfig, Error, ProxyRequest, ResponseSnapshot};
use reqwest::{Client, Method};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve};

/// Something that can perform a network fetch for an intercepted request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a request from the network.
    async fn fetch(&self, request: &ProxyRequest) -> Result<ResponseSnapshot, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "menucache-sw/0.1")
    pub user_agent: String,

    /// Optional request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "menucache-sw/0.1".to_string(), timeout: None, max_redirects: 5 }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::HttpClient(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();

        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!("unsupported scheme: {}", request.url.scheme())));
        }

        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::NetworkUnavailable(format!("{}: {}", request.url, e)))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkUnavailable(format!("failed to read response: {}", e)))?;

        tracing::debug!(
            url = %request.url,
            status,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched from network"
        );

        Ok(ResponseSnapshot { url: final_url, status, headers, body: body.to_vec(), stored_at: None })
    }
}
