//! cache_prime tool implementation.
//!
//! Stores the offline data snapshot served to menu database calls while the
//! network is down.

use menucache_client::OfflineProxy;
use menucache_core::{Error, ResponseSnapshot};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_prime tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePrimeParams {
    /// Snapshot body, usually the menu as JSON.
    pub body: String,

    /// Content-Type of the snapshot (default: "application/json").
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "application/json".into()
}

/// Output from the cache_prime tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePrimeOutput {
    pub url: String,
    pub bytes: usize,
    pub stored_at: Option<String>,
}

/// Implementation of the cache_prime tool.
pub async fn prime_impl(proxy: &OfflineProxy, params: CachePrimeParams) -> Result<CallToolResult, McpError> {
    if params.content_type.contains("json") {
        serde_json::from_str::<serde_json::Value>(&params.body).map_err(Error::from)?;
    }

    let snapshot =
        ResponseSnapshot::new(String::new(), 200, params.body).with_header("content-type", params.content_type);
    let stored = proxy.prime_offline_data(&snapshot).await?;

    json_result(&CachePrimeOutput { url: stored.url, bytes: stored.body.len(), stored_at: stored.stored_at })
}
