//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BEACON_*)
//! 2. TOML config file (if BEACON_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::query::SearchLimits;

mod validation;

pub use validation::ConfigError;

/// Which cache backend the coordinator sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BEACON_*)
/// 2. TOML config file (if BEACON_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite register database.
    ///
    /// Set via BEACON_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Cache backend: `memory` or `sqlite`.
    ///
    /// Set via BEACON_CACHE_BACKEND environment variable.
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,

    /// Path for the `sqlite` cache backend; `:memory:` keeps it in memory.
    ///
    /// Set via BEACON_CACHE_DB_PATH environment variable.
    #[serde(default = "default_cache_db_path")]
    pub cache_db_path: PathBuf,

    /// Entry bound for the `memory` cache backend.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// TTL for cached records (T_pos).
    #[serde(default = "default_positive_ttl_secs")]
    pub positive_ttl_secs: u64,

    /// TTL for "confirmed absent" tombstones (T_neg).
    #[serde(default = "default_negative_ttl_secs")]
    pub negative_ttl_secs: u64,

    /// TTL for cached search pages (T_search).
    #[serde(default = "default_search_ttl_secs")]
    pub search_ttl_secs: u64,

    /// Key prefix for point-lookup entries.
    #[serde(default = "default_record_prefix")]
    pub record_prefix: String,

    /// Key prefix for search-result entries.
    #[serde(default = "default_search_prefix")]
    pub search_prefix: String,

    /// Records per store transaction during bulk import.
    #[serde(default = "default_import_chunk_size")]
    pub import_chunk_size: usize,

    /// Records per export page.
    #[serde(default = "default_export_page_size")]
    pub export_page_size: usize,

    #[serde(default = "default_search_default_limit")]
    pub search_default_limit: usize,

    #[serde(default = "default_search_max_limit")]
    pub search_max_limit: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./beacon.sqlite")
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_cache_db_path() -> PathBuf {
    PathBuf::from(":memory:")
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_positive_ttl_secs() -> u64 {
    3600
}

fn default_negative_ttl_secs() -> u64 {
    60
}

fn default_search_ttl_secs() -> u64 {
    300
}

fn default_record_prefix() -> String {
    "record:".into()
}

fn default_search_prefix() -> String {
    "search:".into()
}

fn default_import_chunk_size() -> usize {
    500
}

fn default_export_page_size() -> usize {
    100
}

fn default_search_default_limit() -> usize {
    25
}

fn default_search_max_limit() -> usize {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_backend: default_cache_backend(),
            cache_db_path: default_cache_db_path(),
            cache_max_entries: default_cache_max_entries(),
            positive_ttl_secs: default_positive_ttl_secs(),
            negative_ttl_secs: default_negative_ttl_secs(),
            search_ttl_secs: default_search_ttl_secs(),
            record_prefix: default_record_prefix(),
            search_prefix: default_search_prefix(),
            import_chunk_size: default_import_chunk_size(),
            export_page_size: default_export_page_size(),
            search_default_limit: default_search_default_limit(),
            search_max_limit: default_search_max_limit(),
        }
    }
}

/// Cache policy consumed by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub positive_ttl: Duration,
    pub negative_ttl: Duration,
    pub search_ttl: Duration,
    pub record_prefix: String,
    pub search_prefix: String,
    pub search_limits: SearchLimits,
}

impl Default for CacheSettings {
    fn default() -> Self {
        AppConfig::default().cache_settings()
    }
}

impl AppConfig {
    /// Cache TTLs, namespaces and search limits for the coordinator.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            positive_ttl: Duration::from_secs(self.positive_ttl_secs),
            negative_ttl: Duration::from_secs(self.negative_ttl_secs),
            search_ttl: Duration::from_secs(self.search_ttl_secs),
            record_prefix: self.record_prefix.clone(),
            search_prefix: self.search_prefix.clone(),
            search_limits: SearchLimits { default_limit: self.search_default_limit, max_limit: self.search_max_limit },
        }
    }

    /// Whether the cache backend should open an in-memory database.
    pub fn cache_in_memory(&self) -> bool {
        self.cache_db_path.as_os_str() == ":memory:"
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BEACON_`
    /// 2. TOML file from `BEACON_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("BEACON_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BEACON_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
