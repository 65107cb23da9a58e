//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, PartitionSpec};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn validate_partition(field: &str, spec: &PartitionSpec) -> Result<(), ConfigError> {
    if spec.name.trim().is_empty() {
        return Err(ConfigError::Invalid { field: format!("{field}.name"), reason: "must not be empty".into() });
    }
    if spec.version.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: format!("{field}.version"),
            hint: "every partition needs a version so stale copies can be collected".into(),
        });
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - a partition name or version is empty
    /// - the static and data partitions resolve to the same id
    /// - the origin is not an absolute http(s) URL
    /// - a static extension does not start with `.`
    /// - `user_agent` is empty
    /// - `timeout_ms` is set below 100ms or above 5 minutes
    /// - `offline.data_path_marker` is empty while an offline data key is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_partition("partitions.static_cache", &self.partitions.static_cache)?;
        validate_partition("partitions.data_cache", &self.partitions.data_cache)?;

        if self.partitions.static_cache.id() == self.partitions.data_cache.id() {
            return Err(ConfigError::Invalid {
                field: "partitions".into(),
                reason: "static and data partitions must have distinct ids".into(),
            });
        }

        let origin = self.origin()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "manifest.origin".into(),
                reason: format!("unsupported scheme: {}", origin.scheme()),
            });
        }

        if let Some(ext) = self.routing.static_extensions.iter().find(|ext| !ext.starts_with('.')) {
            return Err(ConfigError::Invalid {
                field: "routing.static_extensions".into(),
                reason: format!("{ext:?} must start with '.'"),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.offline.data_key.is_some() && self.offline.data_path_marker.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "offline.data_path_marker".into(),
                reason: "must not be empty; an empty marker matches every database call".into(),
            });
        }

        for host in &self.routing.static_hosts {
            if let Some(db_host) = self.routing.database_hosts.iter().find(|db| host.contains(db.as_str())) {
                tracing::warn!(
                    static_host = %host,
                    database_host = %db_host,
                    "static host also matches a database host; database routing takes precedence"
                );
            }
        }

        Ok(())
    }
}
