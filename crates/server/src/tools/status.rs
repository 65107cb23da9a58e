//! sw_status tool implementation.

use menucache_client::OfflineProxy;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

/// Implementation of the sw_status tool.
pub async fn status_impl(proxy: &OfflineProxy) -> Result<CallToolResult, McpError> {
    let status = proxy.status().await?;
    json_result(&status)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{active_offline_proxy, offline_proxy, output_json};
    use super::*;

    #[tokio::test]
    async fn test_status_before_install() {
        let proxy = offline_proxy().await;

        let output = output_json(&status_impl(&proxy).await.unwrap());

        assert_eq!(output["state"], "parsed");
        assert_eq!(output["controlling"], false);
        assert_eq!(output["partitions"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_status_after_activation() {
        let proxy = active_offline_proxy().await;

        let output = output_json(&status_impl(&proxy).await.unwrap());

        assert_eq!(output["state"], "active");
        assert_eq!(output["controlling"], true);
        assert_eq!(output["skip_waiting"], true);
        assert_eq!(output["pending_revalidations"], 0);
    }
}
