//! Scripted network and worker builders for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use menucache_core::{AppConfig, CacheDb, Error, ProxyRequest, ResponseSnapshot};

use super::OfflineProxy;
use crate::fetch::Fetcher;

/// Fetcher answering from a route table. Unrouted URLs are unreachable.
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, ResponseSnapshot>>,
    online: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { routes: Mutex::new(HashMap::new()), online: AtomicBool::new(true), calls: Mutex::new(Vec::new()) })
    }

    pub(crate) fn route(&self, url: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), ResponseSnapshot::new(url, status, body));
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|called| called.as_str() == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ResponseSnapshot, Error> {
        let url = request.url.as_str().to_string();
        self.calls.lock().unwrap().push(url.clone());

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::NetworkUnavailable(format!("{url}: offline")));
        }
        self.routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::NetworkUnavailable(format!("{url}: connection refused")))
    }
}

/// Default configuration with the given local manifest and no external assets.
pub(crate) fn test_config(local_assets: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.manifest.origin = "http://localhost:8080/".into();
    config.manifest.local_assets = local_assets.iter().map(|s| s.to_string()).collect();
    config.manifest.external_assets = Vec::new();
    config
}

pub(crate) async fn proxy_with(config: &AppConfig, fetcher: Arc<MockFetcher>) -> OfflineProxy {
    let db = CacheDb::open_in_memory().await.unwrap();
    OfflineProxy::new(config, db, fetcher).unwrap()
}

/// An installed and activated worker with an empty manifest.
pub(crate) async fn active_proxy(fetcher: Arc<MockFetcher>) -> OfflineProxy {
    let proxy = proxy_with(&test_config(&[]), fetcher).await;
    proxy.install().await.unwrap();
    proxy.activate().await.unwrap();
    proxy
}
