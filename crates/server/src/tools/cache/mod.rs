//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and maintaining the record cache.

pub mod purge;
pub mod stats;

pub use purge::{CachePurgeParams, purge_impl};
pub use stats::{CacheStatsParams, stats_impl};
