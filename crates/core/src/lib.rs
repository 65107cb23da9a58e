//! Core types and shared functionality for menucache.
//!
//! This crate provides:
//! - Versioned cache partitions with a SQLite backend
//! - Request/response snapshot types and the request classifier
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod request;

pub use cache::{CacheDb, Partition, PartitionRegistry, PartitionRole};
pub use classify::{AssetClassifier, RoutingClass, Strategy};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::{ProxyRequest, ResponseSnapshot};
