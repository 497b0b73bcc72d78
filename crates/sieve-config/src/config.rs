//! Configuration sections.
//!
//! Every section derives `Default` and is `#[serde(default)]`, so a file only
//! needs to mention the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for a Sieve deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SieveConfig {
    /// Query compilation settings
    pub query: QueryConfig,
    /// Relational storage settings
    pub storage: StorageConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Settings that change how criteria compile into predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Whether CONTAIN / START_WITH / END_WITH match case-sensitively
    pub case_sensitive_text: bool,
    /// Page size used by batch consumption when the caller gives none
    pub default_page_size: u32,
    /// Upper bound accepted for any page size
    pub max_page_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            case_sensitive_text: false,
            default_page_size: 20,
            max_page_size: 1000,
        }
    }
}

/// Database file and connection tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database path, or `:memory:`
    pub path: PathBuf,
    /// Enable write-ahead logging
    pub wal_mode: bool,
    /// Enforce foreign keys
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u32,
    /// Page cache size (negative values are KiB, as in SQLite)
    pub cache_size: i64,
    /// Memory-mapped I/O size in bytes; 0 disables it
    pub mmap_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./sieve.db"),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
            cache_size: -64000,
            mmap_size: 0,
        }
    }
}

impl StorageConfig {
    /// In-memory database settings (WAL is meaningless there)
    pub fn memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            wal_mode: false,
            ..Default::default()
        }
    }

    /// Whether this configuration points at an in-memory database
    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(":memory:")
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `sieve_query=trace`
    pub filter: String,
    /// Emit ANSI colors
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}
