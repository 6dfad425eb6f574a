//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `config.toml` in the user config dir (`FOLIO_CONFIG_DIR`, or the
//!    platform default such as `~/.config/folio`)
//! 2. `./folio.toml` (project-local)
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, FolioConfig, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "folio.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

const APP_NAME: &str = "folio";

/// Environment variable that overrides the user config directory.
pub const CONFIG_DIR_ENV: &str = "FOLIO_CONFIG_DIR";

/// A config file that was checked during discovery.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: FolioConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Problems that did not stop loading (unreadable or malformed layers).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `FOLIO_CONFIG_DIR` and the platform default.
///
/// A malformed layer is skipped with a warning. The merged result is then
/// validated; invalid values are an error.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = FolioConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    config.validate()?;

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<FolioConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    FolioConfig::from_toml(&contents)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config(config: &FolioConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Path of the user config file.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// User config directory: `FOLIO_CONFIG_DIR` if set, else the platform
/// config dir joined with `folio`.
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

fn load_layer(config: &mut FolioConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    let mut source = ConfigSource {
        path: path.to_path_buf(),
        loaded: false,
    };
    if !path.is_file() {
        return source;
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            source.loaded = true;
        }
        Err(e) => warnings.push(format!("Failed to load {}: {}", path.display(), e)),
    }
    source
}
