//! Loading configuration from disk or strings.

use crate::config::SieveConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use tracing::{debug, info};

/// Loads and validates [`SieveConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a file, picking the format from its extension.
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<SieveConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Parse TOML text
    pub fn from_toml_str(contents: &str) -> ConfigResult<SieveConfig> {
        let config: SieveConfig = toml::from_str(contents)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Parse JSON text
    pub fn from_json_str(contents: &str) -> ConfigResult<SieveConfig> {
        let config: SieveConfig = serde_json::from_str(contents)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(config: &SieveConfig) -> ConfigResult<()> {
        let query = &config.query;
        if query.max_page_size == 0 {
            return Err(ConfigError::Validation(
                "query.max_page_size must be greater than zero".to_string(),
            ));
        }
        if query.default_page_size == 0 || query.default_page_size > query.max_page_size {
            return Err(ConfigError::Validation(format!(
                "query.default_page_size must be between 1 and {} (got {})",
                query.max_page_size, query.default_page_size
            )));
        }
        if config.storage.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.path must not be empty".to_string(),
            ));
        }

        debug!(?config, "Configuration validated");
        Ok(())
    }
}
