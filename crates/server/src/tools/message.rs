//! sw_message tool implementation.
//!
//! Delivers a control message posted by the host page.

use menucache_client::{ControlMessage, OfflineProxy};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type: "skipWaiting" or "clearCache".
    #[serde(rename = "type")]
    pub kind: String,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(proxy: &OfflineProxy, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message: ControlMessage = params.kind.parse()?;
    let outcome = proxy.message(message).await?;
    json_result(&outcome)
}
