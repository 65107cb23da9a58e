//! SQLite-backed storage for versioned cache partitions.
//!
//! This module provides a persistent request/response cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions, one current version per role
//! - Content-addressed entry keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Garbage collection of stale partitions and unconditional purge

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;
pub mod registry;

pub use crate::Error;

pub use connection::CacheDb;
pub use registry::{Partition, PartitionRegistry, PartitionRole};
