//! sw_install and sw_activate tool implementations.
//!
//! Each tool replies only once the lifecycle work has finished.

use menucache_client::{ActivateReport, InstallReport, OfflineProxy};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallParams {
    /// Activate immediately when install requests skip-waiting (default: true).
    #[serde(default = "default_true")]
    pub honor_skip_waiting: bool,
}

impl Default for SwInstallParams {
    fn default() -> Self {
        Self { honor_skip_waiting: true }
    }
}

fn default_true() -> bool {
    true
}

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwInstallOutput {
    pub install: InstallReport,
    /// Present when the worker activated right after installing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation: Option<ActivateReport>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(proxy: &OfflineProxy, params: SwInstallParams) -> Result<CallToolResult, McpError> {
    let install = proxy.install().await?;

    let activation = if params.honor_skip_waiting && install.skip_waiting {
        Some(proxy.activate().await?)
    } else {
        None
    };

    json_result(&SwInstallOutput { install, activation })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(proxy: &OfflineProxy) -> Result<CallToolResult, McpError> {
    let report = proxy.activate().await?;
    json_result(&report)
}
