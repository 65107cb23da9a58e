//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting cache partitions and seeding the
//! offline data snapshot.

pub mod keys;
pub mod prime;

pub use keys::{CacheKeysParams, keys_impl};
pub use prime::{CachePrimeParams, prime_impl};
