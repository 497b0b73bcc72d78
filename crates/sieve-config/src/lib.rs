//! # Sieve Configuration Library
//!
//! Configuration for the Sieve query compiler and its storage backends.
//!
//! ## Features
//!
//! - TOML and JSON configuration files (chosen by file extension)
//! - Serde defaults for every section, so partial files are valid
//! - Validation after load
//! - Logging bootstrap for binaries and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sieve_config::{init_logging, ConfigLoader};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("sieve.toml")?;
//!     init_logging(&config.logging)?;
//!     println!("max page size: {}", config.query.max_page_size);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod loader;
mod logging;

pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use logging::init_logging;
