//! Connection configuration

use serde::{Deserialize, Serialize};
use sieve_config::StorageConfig;
use std::path::{Path, PathBuf};

const MEMORY_PATH: &str = ":memory:";

/// Settings applied when a [`SqlitePool`](crate::SqlitePool) opens its connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    /// `journal_mode = WAL` plus `synchronous = NORMAL`
    pub wal_mode: bool,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u32,
    /// Negative values are KiB, positive values pages
    pub cache_size: i64,
    /// Zero leaves memory mapping off
    pub mmap_size: u64,
}

impl SqliteConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::from(&StorageConfig::default())
        }
    }

    /// In-memory database; WAL does not apply
    pub fn memory() -> Self {
        Self {
            wal_mode: false,
            ..Self::new(MEMORY_PATH)
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

impl From<&StorageConfig> for SqliteConfig {
    fn from(storage: &StorageConfig) -> Self {
        Self {
            path: storage.path.clone(),
            wal_mode: storage.wal_mode,
            foreign_keys: storage.foreign_keys,
            busy_timeout_ms: storage.busy_timeout_ms,
            cache_size: storage.cache_size,
            mmap_size: storage.mmap_size,
        }
    }
}
