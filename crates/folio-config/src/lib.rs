//! Configuration for Folio.
//!
//! TOML configuration with two sections, `[continuation]` and `[logging]`,
//! layered from the user config directory and a project-local
//! `folio.toml`.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::{ContinuationSection, FolioConfig, LoggingConfig};
