//! Fetch strategies.
//!
//! | Class                | Strategy      | Offline answer                          |
//! |----------------------|---------------|-----------------------------------------|
//! | StaticAsset, Other   | cache-first   | root document for HTML requests         |
//! | HtmlNavigation       | network-first | cached copy, then root document         |
//! | RemoteDatabaseCall   | network-only  | offline data snapshot or `{"error":..}` |
//!
//! Any `Err` from the fetcher counts as the network being unavailable. An
//! HTTP error status is an answer and is returned uncached.

use menucache_core::{Error, Partition, PartitionRole, ProxyRequest, ResponseSnapshot, RoutingClass, Strategy};
use serde::{Deserialize, Serialize};

use super::OfflineProxy;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The root document stood in for an unreachable page.
    Fallback,
    OfflineData,
    /// Built by the worker, never fetched.
    Synthesized,
}

/// A response the worker answered with.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
    pub class: RoutingClass,
}

/// What the worker did with an intercepted request.
#[derive(Debug, Clone)]
pub enum Interception {
    /// Not intercepted; the host performs its default network behavior.
    PassThrough,
    Respond(Served),
}

impl Interception {
    pub fn served(self) -> Option<Served> {
        match self {
            Interception::PassThrough => None,
            Interception::Respond(served) => Some(served),
        }
    }
}

impl OfflineProxy {
    /// Classify an intercepted request and serve it.
    ///
    /// Requests pass through until the worker controls its clients, and
    /// whenever the classifier declines them (non-GET, non-http).
    ///
    /// # Errors
    ///
    /// Returns `Error::NetworkUnavailable` when neither the network nor any
    /// cache can answer, or a storage error from a cache lookup.
    pub async fn fetch(&self, request: &ProxyRequest) -> Result<Interception, Error> {
        if !self.lifecycle.is_controlling() {
            return Ok(Interception::PassThrough);
        }

        let Some(class) = self.classifier.classify(request) else {
            tracing::trace!(method = %request.method, url = %request.url, "request passed through");
            return Ok(Interception::PassThrough);
        };

        let (response, source) = match class.strategy() {
            Strategy::CacheFirst => {
                let partition = self.registry.open(PartitionRole::Static).await?;
                self.cache_first(request, &partition).await?
            }
            Strategy::NetworkFirst => {
                let partition = self.registry.open(PartitionRole::Static).await?;
                self.network_first(request, &partition).await?
            }
            Strategy::NetworkOnly => self.network_only(request).await,
        };

        tracing::debug!(url = %request.url, class = ?class, source = ?source, status = response.status, "served");
        Ok(Interception::Respond(Served { response, source, class }))
    }

    /// Serve from cache and refresh in the background, or fetch and store.
    pub(crate) async fn cache_first(
        &self, request: &ProxyRequest, partition: &Partition,
    ) -> Result<(ResponseSnapshot, ResponseSource), Error> {
        if let Some(cached) = partition.match_request(request).await? {
            self.revalidator.spawn(request.clone(), partition.clone());
            return Ok((cached, ResponseSource::Cache));
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(partition, request, &response).await;
                }
                Ok((response, ResponseSource::Network))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "cache miss while offline");
                if request.accepts_html()
                    && let Some(document) = self.fallback_document(request, partition).await?
                {
                    return Ok((document, ResponseSource::Fallback));
                }
                Err(offline(request, e))
            }
        }
    }

    /// Prefer the network, keeping the cache current; fall back when offline.
    pub(crate) async fn network_first(
        &self, request: &ProxyRequest, partition: &Partition,
    ) -> Result<(ResponseSnapshot, ResponseSource), Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(partition, request, &response).await;
                }
                Ok((response, ResponseSource::Network))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "navigation failed, trying cache");
                if let Some(cached) = partition.match_request(request).await? {
                    return Ok((cached, ResponseSource::Cache));
                }
                if let Some(document) = self.fallback_document(request, partition).await? {
                    return Ok((document, ResponseSource::Fallback));
                }
                Err(offline(request, e))
            }
        }
    }

    /// Database calls always go to the network and are never cached.
    pub(crate) async fn network_only(&self, request: &ProxyRequest) -> (ResponseSnapshot, ResponseSource) {
        match self.fetcher.fetch(request).await {
            Ok(response) => (response, ResponseSource::Network),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "database request failed while offline");
                if let Some(snapshot) = self.offline_data_for(request).await {
                    return (snapshot, ResponseSource::OfflineData);
                }
                (ResponseSnapshot::offline_error(&request.url), ResponseSource::Synthesized)
            }
        }
    }

    /// Store a response, logging instead of failing.
    ///
    /// A partition deleted while the fetch was in flight drops the write.
    pub(crate) async fn store(&self, partition: &Partition, request: &ProxyRequest, response: &ResponseSnapshot) {
        match partition.put(request, response).await {
            Ok(_) => {}
            Err(Error::PartitionRetired(name)) => {
                tracing::debug!(partition = %name, url = %request.url, "partition deleted, response not stored");
            }
            Err(e) => {
                tracing::warn!(partition = %partition.name(), url = %request.url, error = %e, "failed to store response");
            }
        }
    }

    async fn fallback_document(
        &self, request: &ProxyRequest, partition: &Partition,
    ) -> Result<Option<ResponseSnapshot>, Error> {
        let root = ProxyRequest::get(self.fallback_document.clone());
        if root.url == request.url {
            return Ok(None);
        }
        partition.match_request(&root).await
    }

    /// The offline data snapshot, if this request asks for it and one is stored.
    async fn offline_data_for(&self, request: &ProxyRequest) -> Option<ResponseSnapshot> {
        let offline = self.offline_data.as_ref()?;
        if !request.url.path().contains(offline.path_marker.as_str()) {
            return None;
        }

        let lookup = async {
            let partition = self.registry.open(PartitionRole::Data).await?;
            partition.match_request(&ProxyRequest::get(offline.key.clone())).await
        };
        match lookup.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(key = %offline.key, error = %e, "offline data lookup failed");
                None
            }
        }
    }
}

fn offline(request: &ProxyRequest, cause: Error) -> Error {
    if cause.is_network() {
        return cause;
    }
    Error::NetworkUnavailable(format!("{}: {}", request.url, cause))
}
