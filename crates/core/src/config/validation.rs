//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, CacheBackend};
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

const MAX_BATCH: usize = 10_000;

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - any TTL is 0
    /// - `negative_ttl_secs` is not shorter than `positive_ttl_secs`
    /// - `search_ttl_secs` exceeds `positive_ttl_secs`
    /// - a key prefix is empty, or one prefix starts the other
    /// - a chunk or page size is outside 1..=10000
    /// - `search_default_limit` exceeds `search_max_limit`
    ///
    /// Returns `ConfigError::Missing` if a path required by the backend is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "db_path".into(),
                hint: "Set BEACON_DB_PATH environment variable".into(),
            });
        }
        if self.cache_backend == CacheBackend::Sqlite && self.cache_db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_db_path".into(),
                hint: "Set BEACON_CACHE_DB_PATH or use :memory:".into(),
            });
        }

        for (field, value) in [
            ("positive_ttl_secs", self.positive_ttl_secs),
            ("negative_ttl_secs", self.negative_ttl_secs),
            ("search_ttl_secs", self.search_ttl_secs),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }
        if self.negative_ttl_secs >= self.positive_ttl_secs {
            return Err(invalid("negative_ttl_secs", "must be shorter than positive_ttl_secs"));
        }
        if self.search_ttl_secs > self.positive_ttl_secs {
            return Err(invalid("search_ttl_secs", "must not exceed positive_ttl_secs"));
        }

        if self.record_prefix.is_empty() {
            return Err(invalid("record_prefix", "must not be empty"));
        }
        if self.search_prefix.is_empty() {
            return Err(invalid("search_prefix", "must not be empty"));
        }
        if self.record_prefix.starts_with(&self.search_prefix) || self.search_prefix.starts_with(&self.record_prefix) {
            return Err(invalid("search_prefix", "namespaces must not overlap"));
        }

        for (field, value) in [
            ("import_chunk_size", self.import_chunk_size),
            ("export_page_size", self.export_page_size),
            ("search_max_limit", self.search_max_limit),
            ("search_default_limit", self.search_default_limit),
            ("cache_max_entries", self.cache_max_entries),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
            if value > MAX_BATCH && field != "cache_max_entries" {
                return Err(invalid(field, "must not exceed 10000"));
            }
        }
        if self.search_default_limit > self.search_max_limit {
            return Err(invalid("search_default_limit", "must not exceed search_max_limit"));
        }

        if self.search_ttl_secs >= self.positive_ttl_secs / 2 {
            tracing::warn!(
                search_ttl_secs = self.search_ttl_secs,
                positive_ttl_secs = self.positive_ttl_secs,
                "search_ttl_secs is close to positive_ttl_secs; \
                 search pages may drift further than point lookups"
            );
        }

        Ok(())
    }
}
