//! Worker lifecycle: install, wait, activate.
//!
//! Transitions are serialized by a single guard so install and activate never
//! interleave. State reads never wait on a transition in progress.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use menucache_core::{Error, Partition, PartitionRole, ProxyRequest};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinSet;
use url::Url;

use super::OfflineProxy;
use crate::fetch::{Fetcher, resolve};

/// Where the worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Built, install not yet dispatched.
    Parsed,
    Installing,
    /// Installed, waiting for activation.
    Waiting,
    /// Controlling clients.
    Active,
    /// Install could not run; the worker will never activate.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// A manifest entry that could not be cached during install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallFailure {
    /// The manifest entry as configured.
    pub entry: String,
    pub reason: String,
}

/// Outcome of an install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Resolved URLs that were stored, in manifest order.
    pub cached: Vec<String>,
    pub failed: Vec<InstallFailure>,
    pub skip_waiting: bool,
}

/// Outcome of an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateReport {
    /// Stale partitions deleted during activation.
    pub deleted: Vec<String>,
    /// Partitions left after activation.
    pub retained: Vec<String>,
}

/// Point-in-time view of the worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub state_changed_at: String,
    pub controlling: bool,
    pub skip_waiting: bool,
    pub pending_revalidations: usize,
    pub partitions: Vec<String>,
}

/// Lifecycle state plus the flags the host runtime observes.
#[derive(Debug)]
pub struct Lifecycle {
    state: RwLock<(WorkerState, DateTime<Utc>)>,
    skip_waiting: AtomicBool,
    controlling: AtomicBool,
    transition: Mutex<()>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new((WorkerState::Parsed, Utc::now())),
            skip_waiting: AtomicBool::new(false),
            controlling: AtomicBool::new(false),
            transition: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> WorkerState {
        self.state.read().await.0
    }

    /// Current state and when it was entered, as RFC 3339.
    pub async fn snapshot(&self) -> (WorkerState, String) {
        let guard = self.state.read().await;
        (guard.0, guard.1.to_rfc3339())
    }

    /// Whether the worker has claimed its clients.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::Acquire)
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }

    pub(crate) fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::Release);
    }

    pub(crate) fn claim_clients(&self) {
        self.controlling.store(true, Ordering::Release);
    }

    pub(crate) async fn begin_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().await
    }

    pub(crate) async fn set_state(&self, next: WorkerState) {
        let mut guard = self.state.write().await;
        let previous = guard.0;
        *guard = (next, Utc::now());
        tracing::info!(from = %previous, to = %next, "worker state changed");
    }
}

impl OfflineProxy {
    /// Pre-populate the static partition from the asset manifest.
    ///
    /// Every entry is fetched concurrently and stored if the answer is 2xx.
    /// A failing entry is logged and reported but never fails the install.
    /// Skip-waiting is requested once all entries have settled.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` unless the worker is freshly parsed, or
    /// the storage error that kept the static partition from opening. The
    /// latter leaves the worker `Redundant`.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let _transition = self.lifecycle.begin_transition().await;

        let state = self.lifecycle.state().await;
        if state != WorkerState::Parsed {
            return Err(Error::InvalidState(format!("install requires a parsed worker, found {state}")));
        }
        self.lifecycle.set_state(WorkerState::Installing).await;

        let partition = match self.registry.open(PartitionRole::Static).await {
            Ok(partition) => partition,
            Err(e) => {
                tracing::error!(error = %e, "static partition unavailable, install abandoned");
                self.lifecycle.set_state(WorkerState::Redundant).await;
                return Err(e);
            }
        };

        let mut tasks = JoinSet::new();
        for (index, entry) in self.manifest.iter().enumerate() {
            let entry = entry.clone();
            let resolved = resolve(&self.origin, &entry);
            let fetcher = Arc::clone(&self.fetcher);
            let partition = partition.clone();

            tasks.spawn(async move {
                let outcome = match resolved {
                    Ok(url) => precache(fetcher.as_ref(), &partition, url).await,
                    Err(e) => Err(e.to_string()),
                };
                (index, entry, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(self.manifest.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(error = %e, "manifest task did not complete"),
            }
        }
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut cached = Vec::new();
        let mut failed = Vec::new();
        for (_, entry, outcome) in outcomes {
            match outcome {
                Ok(url) => cached.push(url),
                Err(reason) => {
                    tracing::warn!(asset = %entry, reason = %reason, "failed to cache asset");
                    failed.push(InstallFailure { entry, reason });
                }
            }
        }

        self.lifecycle.request_skip_waiting();
        self.lifecycle.set_state(WorkerState::Waiting).await;
        tracing::info!(
            partition = %partition.name(),
            cached = cached.len(),
            failed = failed.len(),
            "static assets cached"
        );

        Ok(InstallReport { cached, failed, skip_waiting: self.lifecycle.skip_waiting_requested() })
    }

    /// Delete stale partitions and take control of clients.
    ///
    /// Both current partitions exist once this returns. Activating an active
    /// worker runs garbage collection again.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` before install has finished, or the
    /// storage error that interrupted garbage collection.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let _transition = self.lifecycle.begin_transition().await;

        let state = self.lifecycle.state().await;
        if !matches!(state, WorkerState::Waiting | WorkerState::Active) {
            return Err(Error::InvalidState(format!("activate requires an installed worker, found {state}")));
        }

        let deleted = self.registry.delete_stale().await?;
        self.registry.open(PartitionRole::Static).await?;
        self.registry.open(PartitionRole::Data).await?;

        self.lifecycle.set_state(WorkerState::Active).await;
        self.lifecycle.claim_clients();

        let retained = self.registry.names().await?;
        tracing::info!(deleted = deleted.len(), retained = ?retained, "worker activated");
        Ok(ActivateReport { deleted, retained })
    }
}

/// Fetch one manifest entry and store it. Errors are reported as text.
async fn precache(fetcher: &dyn Fetcher, partition: &Partition, url: Url) -> Result<String, String> {
    let request = ProxyRequest::get(url);
    let response = fetcher.fetch(&request).await.map_err(|e| e.to_string())?;
    if !response.is_success() {
        return Err(format!("unexpected status {}", response.status));
    }
    partition.put(&request, &response).await.map_err(|e| e.to_string())?;
    Ok(request.url.to_string())
}
