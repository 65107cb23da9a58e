//! cache_keys tool implementation.
//!
//! Lists the entry URLs stored in each partition.

use menucache_client::OfflineProxy;
use menucache_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Only list this partition id (e.g. "static-v2"); all partitions when omitted.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Entries of one partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionKeys {
    pub name: String,
    /// Whether this is one of the worker's current partitions.
    pub current: bool,
    pub urls: Vec<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheKeysOutput {
    pub partitions: Vec<PartitionKeys>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(proxy: &OfflineProxy, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let registry = proxy.registry();
    let mut names = registry.names().await?;

    if let Some(wanted) = params.partition {
        if !names.contains(&wanted) {
            return Err(Error::InvalidInput(format!("no such partition: {wanted}")).into());
        }
        names = vec![wanted];
    }

    let mut partitions = Vec::with_capacity(names.len());
    for name in names {
        let urls = registry.keys_of(&name).await?;
        partitions.push(PartitionKeys { current: registry.is_current(&name), name, urls });
    }

    json_result(&CacheKeysOutput { partitions })
}
