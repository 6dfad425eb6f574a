//! CLI command handlers.

pub mod config;
pub mod drain;
pub mod page;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use folio_agent::ContinuationService;
use folio_config::{ContinuationSection, LoadedConfig};
use folio_types::ResultItem;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// User config directory given on the command line.
    pub config_dir: Option<PathBuf>,
    /// Configuration after discovery and merging.
    pub loaded: LoadedConfig,
}

impl Context {
    pub fn continuation(&self) -> ContinuationSection {
        self.loaded.config.continuation()
    }

    /// Open a continuation service from the loaded configuration.
    pub fn open_service(&self) -> Result<ContinuationService<ResultItem>> {
        let store_config = self.continuation().to_store_config()?;
        Ok(ContinuationService::open(store_config)?)
    }

    /// Resolve a requested page size against the configured limits.
    pub fn page_size(&self, requested: Option<usize>) -> Result<usize> {
        let section = self.continuation();
        match requested {
            None => Ok(section.default_page_size),
            Some(0) => bail!("--page-size must be at least 1"),
            Some(n) if n > section.max_page_size => {
                bail!("--page-size {} exceeds max_page_size ({})", n, section.max_page_size)
            }
            Some(n) => Ok(n),
        }
    }
}

/// Read a JSON array of result items.
pub fn load_items(path: &Path) -> Result<Vec<ResultItem>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let items: Vec<ResultItem> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of result items", path.display()))?;
    Ok(items)
}

/// Session key for a file when none is given: its stem.
pub fn default_session_key(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("results")
        .to_string()
}

/// One-line rendering of an item for terminal output.
pub fn describe(item: &ResultItem) -> String {
    let mut line = match item.title {
        Some(ref title) => format!("{}: {}", title, item.content),
        None => item.content.clone(),
    };
    if let Some(ref url) = item.metadata.url {
        line.push_str(&format!(" <{}>", url));
    }
    line
}
