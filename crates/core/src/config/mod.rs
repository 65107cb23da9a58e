//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MENUCACHE_*)
//! 2. TOML config file (if MENUCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The defaults are the partition versions, asset manifest and host lists the
//! menu site ships with. Everything is read once at startup and handed to the
//! proxy components as immutable configuration.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MENUCACHE_*, nested keys split on `__`)
/// 2. TOML config file (if MENUCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding the cache partitions.
    ///
    /// Set via MENUCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for outgoing requests.
    ///
    /// Set via MENUCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional HTTP timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via MENUCACHE_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub partitions: PartitionsConfig,

    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub offline: OfflineConfig,
}

/// Name and version of one cache partition role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub name: String,
    pub version: String,
}

impl PartitionSpec {
    pub fn new(name: &str, version: &str) -> Self {
        Self { name: name.into(), version: version.into() }
    }

    /// Partition id as stored, e.g. `static-v2`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// The two partition roles and their current versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionsConfig {
    #[serde(default = "default_static_partition")]
    pub static_cache: PartitionSpec,

    #[serde(default = "default_data_partition")]
    pub data_cache: PartitionSpec,
}

/// Assets pre-populated into the static partition at install time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Base URL the local assets are resolved against (the worker scope).
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Site-relative paths of the local static files.
    #[serde(default = "default_local_assets")]
    pub local_assets: Vec<String>,

    /// Absolute URLs of external fonts and stylesheets.
    #[serde(default = "default_external_assets")]
    pub external_assets: Vec<String>,
}

/// Inputs of the request classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Path suffixes that mark a static asset.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Hosts whose every response is a static asset.
    #[serde(default = "default_static_hosts")]
    pub static_hosts: Vec<String>,

    /// Host substrings identifying the remote document database.
    #[serde(default = "default_database_hosts")]
    pub database_hosts: Vec<String>,
}

/// Fallbacks used when the network is unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Document served to HTML requests with no cached copy, relative to the origin.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// Key of the offline data snapshot in the data partition, relative to the origin.
    #[serde(default = "default_data_key")]
    pub data_key: Option<String>,

    /// Database request paths containing this marker may be answered with the offline data.
    #[serde(default = "default_data_path_marker")]
    pub data_path_marker: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./menucache.sqlite")
}

fn default_user_agent() -> String {
    "menucache-sw/0.1".into()
}

fn default_static_partition() -> PartitionSpec {
    PartitionSpec::new("static", "v2")
}

fn default_data_partition() -> PartitionSpec {
    PartitionSpec::new("data", "v1")
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_local_assets() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./admin.html",
        "./css/common.css",
        "./js/firebase-config.js",
        "./js/utils/normalize.js",
        "./js/utils/formatters.js",
        "./js/utils/error-handling.js",
        "./js/utils/sanitize.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_external_assets() -> Vec<String> {
    vec![
        "https://fonts.googleapis.com/css2?family=Inter:wght@400;600;700&display=swap".into(),
        "https://cdn.tailwindcss.com".into(),
    ]
}

fn default_static_extensions() -> Vec<String> {
    [".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".woff", ".woff2", ".ttf"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_static_hosts() -> Vec<String> {
    vec!["fonts.googleapis.com".into(), "fonts.gstatic.com".into(), "cdn.tailwindcss.com".into()]
}

fn default_database_hosts() -> Vec<String> {
    vec!["firestore.googleapis.com".into(), "firebase".into(), "googleapis.com".into()]
}

fn default_fallback_document() -> String {
    "./index.html".into()
}

fn default_data_key() -> Option<String> {
    Some("./offline-menu.json".into())
}

fn default_data_path_marker() -> String {
    "menu".into()
}

impl Default for PartitionsConfig {
    fn default() -> Self {
        Self { static_cache: default_static_partition(), data_cache: default_data_partition() }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            local_assets: default_local_assets(),
            external_assets: default_external_assets(),
        }
    }
}

impl ManifestConfig {
    /// Every manifest entry in install order: local files first, then external assets.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.local_assets
            .iter()
            .chain(self.external_assets.iter())
            .map(String::as_str)
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            static_extensions: default_static_extensions(),
            static_hosts: default_static_hosts(),
            database_hosts: default_database_hosts(),
        }
    }
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            fallback_document: default_fallback_document(),
            data_key: default_data_key(),
            data_path_marker: default_data_path_marker(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            partitions: PartitionsConfig::default(),
            manifest: ManifestConfig::default(),
            routing: RoutingConfig::default(),
            offline: OfflineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MENUCACHE_`
    /// 2. TOML file from `MENUCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MENUCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MENUCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed manifest origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute URL.
    pub fn origin(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.manifest.origin)
            .map_err(|e| ConfigError::Invalid { field: "manifest.origin".into(), reason: e.to_string() })
    }
}
