//! Registry of the current cache partitions.
//!
//! The registry knows which partition id is current for each role and only
//! hands out handles for those, so superseded versions are never written to.
//! Stale partitions can be listed, collected, or purged.

use serde::{Deserialize, Serialize};

use super::connection::CacheDb;
use super::entries::EntryKey;
use super::hash::{compute_cache_key, identity_url};
use crate::config::PartitionsConfig;
use crate::request::{ProxyRequest, ResponseSnapshot};
use crate::Error;

/// Logical role of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionRole {
    Static,
    Data,
}

/// Handle to one open partition.
#[derive(Debug, Clone)]
pub struct Partition {
    name: String,
    db: CacheDb,
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the snapshot stored for a request.
    pub async fn match_request(&self, request: &ProxyRequest) -> Result<Option<ResponseSnapshot>, Error> {
        let key = compute_cache_key(&request.method, &request.url);
        self.db.get_entry(&self.name, &key).await
    }

    /// Store a snapshot for a request, replacing any previous one.
    ///
    /// Returns the stored snapshot with its `stored_at` timestamp set.
    pub async fn put(&self, request: &ProxyRequest, response: &ResponseSnapshot) -> Result<ResponseSnapshot, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("only GET requests are cached, got {}", request.method)));
        }
        let key = EntryKey {
            key: compute_cache_key(&request.method, &request.url),
            method: request.method.to_ascii_uppercase(),
            url: identity_url(&request.url),
        };
        let stored_at = self.db.put_entry(&self.name, &key, response).await?;
        Ok(ResponseSnapshot { stored_at: Some(stored_at), ..response.clone() })
    }

    /// Identity URLs of every entry in the partition.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.db.list_entry_urls(&self.name).await
    }
}

/// Tracks which partition ids are current and manages their storage.
#[derive(Debug, Clone)]
pub struct PartitionRegistry {
    db: CacheDb,
    static_id: String,
    data_id: String,
}

impl PartitionRegistry {
    pub fn new(db: CacheDb, partitions: &PartitionsConfig) -> Self {
        Self { db, static_id: partitions.static_cache.id(), data_id: partitions.data_cache.id() }
    }

    pub fn current_id(&self, role: PartitionRole) -> &str {
        match role {
            PartitionRole::Static => &self.static_id,
            PartitionRole::Data => &self.data_id,
        }
    }

    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_id || name == self.data_id
    }

    /// Open the current partition for a role, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the underlying storage is unavailable.
    pub async fn open(&self, role: PartitionRole) -> Result<Partition, Error> {
        let name = self.current_id(role).to_string();
        if self.db.create_partition(&name).await? {
            tracing::debug!(partition = %name, "created cache partition");
        }
        Ok(Partition { name, db: self.db.clone() })
    }

    /// Every partition currently stored, current or not.
    pub async fn names(&self) -> Result<Vec<String>, Error> {
        self.db.list_partitions().await
    }

    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.db.delete_partition(name).await
    }

    /// Delete every partition that is not current.
    ///
    /// Returns the deleted partition ids.
    pub async fn delete_stale(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.names().await? {
            if self.is_current(&name) {
                continue;
            }
            if self.delete(&name).await? {
                tracing::info!(partition = %name, "deleted stale cache partition");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Delete every partition regardless of version.
    ///
    /// Returns the deleted partition ids.
    ///
    /// # Errors
    ///
    /// Returns `Error::PurgeIncomplete` if any partition could not be deleted;
    /// the ones left behind remain usable.
    pub async fn purge_all(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for name in self.names().await? {
            match self.delete(&name).await {
                Ok(_) => deleted.push(name),
                Err(e) => {
                    tracing::warn!(partition = %name, error = %e, "failed to delete cache partition");
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            Ok(deleted)
        } else {
            Err(Error::PurgeIncomplete { deleted: deleted.len(), failed })
        }
    }

    /// Number of entries across every partition.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.db.count_entries().await
    }

    /// Entry URLs of a partition by id, current or not.
    pub async fn keys_of(&self, name: &str) -> Result<Vec<String>, Error> {
        self.db.list_entry_urls(name).await
    }
}
