//! The offline cache proxy worker.
//!
//! `OfflineProxy` exposes one method per lifecycle signal the host runtime
//! delivers:
//!
//! - `install`: pre-populate the static partition from the asset manifest
//! - `activate`: collect stale partitions and take control of clients
//! - `fetch`: classify an intercepted request and serve it
//! - `message`: handle a control message from the host page
//!
//! All configuration is read once in `new`; the worker holds no ambient state.

pub mod control;
pub mod lifecycle;
pub mod revalidate;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use control::{ControlMessage, ControlOutcome};
pub use lifecycle::{ActivateReport, InstallFailure, InstallReport, Lifecycle, WorkerState, WorkerStatus};
pub use revalidate::Revalidator;
pub use strategy::{Interception, ResponseSource, Served};

use std::sync::Arc;

use menucache_core::{
    AppConfig, AssetClassifier, CacheDb, Error, PartitionRegistry, PartitionRole, ProxyRequest, ResponseSnapshot,
};
use url::Url;

use crate::fetch::{Fetcher, resolve};

/// Where the offline data snapshot lives and which requests may receive it.
#[derive(Debug, Clone)]
struct OfflineData {
    key: Url,
    path_marker: String,
}

/// Background worker that intercepts requests and manages cache partitions.
pub struct OfflineProxy {
    registry: PartitionRegistry,
    classifier: AssetClassifier,
    fetcher: Arc<dyn Fetcher>,
    revalidator: Revalidator,
    lifecycle: Lifecycle,
    origin: Url,
    manifest: Vec<String>,
    fallback_document: Url,
    offline_data: Option<OfflineData>,
}

impl OfflineProxy {
    /// Build a worker from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin, fallback document, or
    /// offline data key cannot be resolved. Manifest entries are resolved
    /// lazily at install time so one bad entry cannot block the worker.
    pub fn new(config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = config.origin().map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let fallback_document = resolve(&origin, &config.offline.fallback_document)
            .map_err(|e| Error::InvalidUrl(format!("fallback document: {e}")))?;

        let offline_data = match &config.offline.data_key {
            Some(key) => Some(OfflineData {
                key: resolve(&origin, key).map_err(|e| Error::InvalidUrl(format!("offline data key: {e}")))?,
                path_marker: config.offline.data_path_marker.clone(),
            }),
            None => None,
        };

        Ok(Self {
            registry: PartitionRegistry::new(db, &config.partitions),
            classifier: AssetClassifier::new(&config.routing),
            revalidator: Revalidator::new(Arc::clone(&fetcher)),
            fetcher,
            lifecycle: Lifecycle::new(),
            origin,
            manifest: config.manifest.entries().map(String::from).collect(),
            fallback_document,
            offline_data,
        })
    }

    pub fn registry(&self) -> &PartitionRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Store the snapshot served to database calls for menu data while offline.
    ///
    /// The snapshot is stored under the configured data key, whatever its URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` when no offline data key is configured.
    pub async fn prime_offline_data(&self, snapshot: &ResponseSnapshot) -> Result<ResponseSnapshot, Error> {
        let offline = self
            .offline_data
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("no offline data key configured".into()))?;

        let partition = self.registry.open(PartitionRole::Data).await?;
        let snapshot = ResponseSnapshot { url: offline.key.to_string(), ..snapshot.clone() };
        let stored = partition.put(&ProxyRequest::get(offline.key.clone()), &snapshot).await?;
        tracing::info!(key = %offline.key, bytes = stored.body.len(), "stored offline data snapshot");
        Ok(stored)
    }

    /// Point-in-time view of the worker for diagnostics.
    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        let (state, state_changed_at) = self.lifecycle.snapshot().await;
        Ok(WorkerStatus {
            state,
            state_changed_at,
            controlling: self.lifecycle.is_controlling(),
            skip_waiting: self.lifecycle.skip_waiting_requested(),
            pending_revalidations: self.revalidator.pending(),
            partitions: self.registry.names().await?,
        })
    }

    /// Wait for every background revalidation started so far.
    pub async fn settle(&self) {
        self.revalidator.settle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{MockFetcher, active_proxy, proxy_with, test_config};
    use super::*;

    fn get(url: &str) -> ProxyRequest {
        ProxyRequest::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_new_rejects_bad_origin() {
        let mut config = test_config(&[]);
        config.manifest.origin = "not a url".into();
        let db = CacheDb::open_in_memory().await.unwrap();

        let result = OfflineProxy::new(&config, db, MockFetcher::new());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_stylesheet_scenario() {
        let fetcher = MockFetcher::new();
        fetcher.route("http://localhost:8080/css/common.css", 200, "body{color:red}");
        let proxy = active_proxy(fetcher.clone()).await;
        let request = get("http://localhost:8080/css/common.css");

        let first = proxy.fetch(&request).await.unwrap().served().unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(fetcher.calls_to("http://localhost:8080/css/common.css"), 1);

        let second = proxy.fetch(&request).await.unwrap().served().unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response.body, b"body{color:red}");

        proxy.settle().await;
        assert_eq!(fetcher.calls_to("http://localhost:8080/css/common.css"), 2);
    }

    #[tokio::test]
    async fn test_navigation_offline_falls_back_to_root_document() {
        let fetcher = MockFetcher::new();
        let config = test_config(&["./index.html"]);
        fetcher.route("http://localhost:8080/index.html", 200, "<html>root</html>");
        let proxy = proxy_with(&config, fetcher.clone()).await;
        proxy.install().await.unwrap();
        proxy.activate().await.unwrap();
        fetcher.set_online(false);

        let request = get("http://localhost:8080/index.html?table=4").with_header("accept", "text/html");
        let served = proxy.fetch(&request).await.unwrap().served().unwrap();

        assert_eq!(served.source, ResponseSource::Fallback);
        assert_eq!(served.response.body, b"<html>root</html>");
    }

    #[tokio::test]
    async fn test_database_offline_without_snapshot_returns_json_error() {
        let fetcher = MockFetcher::new();
        let mut config = test_config(&[]);
        config.offline.data_key = None;
        let proxy = proxy_with(&config, fetcher.clone()).await;
        proxy.install().await.unwrap();
        proxy.activate().await.unwrap();
        fetcher.set_online(false);

        let request = get("https://firestore.googleapis.com/v1/projects/china-cafe-menu/databases/(default)/documents/menu");
        let served = proxy.fetch(&request).await.unwrap().served().unwrap();

        assert_eq!(served.source, ResponseSource::Synthesized);
        assert_eq!(served.response.content_type(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&served.response.body).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Offline" }));
    }

    #[tokio::test]
    async fn test_install_with_one_unreachable_asset() {
        let fetcher = MockFetcher::new();
        let config =
            test_config(&["./", "./index.html", "./css/common.css", "./js/utils/formatters.js", "./js/missing.js"]);
        for url in [
            "http://localhost:8080/",
            "http://localhost:8080/index.html",
            "http://localhost:8080/css/common.css",
            "http://localhost:8080/js/utils/formatters.js",
        ] {
            fetcher.route(url, 200, "ok");
        }
        let proxy = proxy_with(&config, fetcher).await;

        let report = proxy.install().await.unwrap();

        assert_eq!(report.cached.len(), 4);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].entry, "./js/missing.js");
        let partition = proxy.registry().open(PartitionRole::Static).await.unwrap();
        assert_eq!(partition.keys().await.unwrap().len(), 4);
        assert_eq!(proxy.lifecycle().state().await, WorkerState::Waiting);
    }

    #[tokio::test]
    async fn test_prime_offline_data_requires_key() {
        let mut config = test_config(&[]);
        config.offline.data_key = None;
        let proxy = proxy_with(&config, MockFetcher::new()).await;

        let result = proxy.prime_offline_data(&ResponseSnapshot::new("x", 200, "[]")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_status_reports_lifecycle() {
        let proxy = active_proxy(MockFetcher::new()).await;

        let status = proxy.status().await.unwrap();

        assert_eq!(status.state, WorkerState::Active);
        assert!(status.controlling);
        assert!(status.skip_waiting);
        assert_eq!(status.pending_revalidations, 0);
        let mut partitions = status.partitions;
        partitions.sort();
        assert_eq!(partitions, vec!["data-v1".to_string(), "static-v2".to_string()]);
    }
}
