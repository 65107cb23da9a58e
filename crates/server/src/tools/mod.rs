//! MCP tool implementations.
//!
//! One tool per worker lifecycle signal, plus inspection tools for the cache.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod status;

use menucache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use async_trait::async_trait;
    use menucache_client::{Fetcher, OfflineProxy};
    use menucache_core::{AppConfig, CacheDb, Error, ProxyRequest, ResponseSnapshot};
    use rmcp::model::CallToolResult;

    /// A network that is always down.
    pub(crate) struct Unreachable;

    #[async_trait]
    impl Fetcher for Unreachable {
        async fn fetch(&self, request: &ProxyRequest) -> Result<ResponseSnapshot, Error> {
            Err(Error::NetworkUnavailable(format!("{}: offline", request.url)))
        }
    }

    /// A network that answers every request with the same 200 body.
    pub(crate) struct FixedBody(pub(crate) Vec<u8>);

    #[async_trait]
    impl Fetcher for FixedBody {
        async fn fetch(&self, request: &ProxyRequest) -> Result<ResponseSnapshot, Error> {
            Ok(ResponseSnapshot::new(request.url.as_str(), 200, self.0.clone()))
        }
    }

    pub(crate) async fn proxy_with(fetcher: Arc<dyn Fetcher>) -> OfflineProxy {
        let db = CacheDb::open_in_memory().await.unwrap();
        OfflineProxy::new(&AppConfig::default(), db, fetcher).unwrap()
    }

    pub(crate) async fn offline_proxy() -> OfflineProxy {
        proxy_with(Arc::new(Unreachable)).await
    }

    pub(crate) async fn active_offline_proxy() -> OfflineProxy {
        let proxy = offline_proxy().await;
        proxy.install().await.unwrap();
        proxy.activate().await.unwrap();
        proxy
    }

    /// Parse the JSON text content of a tool result.
    pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
