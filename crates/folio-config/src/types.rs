//! Configuration file model.

use std::time::Duration;

use folio_session::StoreConfig;
use folio_types::{ConfigProvider, HasContinuationConfig, config_defaults};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Root configuration.
///
/// Every section is optional; a missing section means defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Continuation cache settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation: Option<ContinuationSection>,

    /// Logging settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl FolioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: FolioConfig) {
        if other.continuation.is_some() {
            self.continuation = other.continuation;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The continuation section, or defaults if absent.
    pub fn continuation(&self) -> ContinuationSection {
        self.continuation.clone().unwrap_or_default()
    }

    /// The logging section, or defaults if absent.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ref continuation) = self.continuation {
            continuation.validate()?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Continuation
// ─────────────────────────────────────────────────────────────────────────────

/// Continuation cache configuration.
///
/// ```toml
/// [continuation]
/// default_ttl_secs = 900
/// max_entries = 10000
/// default_page_size = 20
/// max_page_size = 200
/// cleanup_interval_secs = 60
/// enable_cleanup_task = true
/// max_drain_iterations = 10000
/// namespace = "folio"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuationSection {
    /// Idle seconds before a session expires.
    pub default_ttl_secs: u64,
    /// Sessions held before the least recently used one is evicted.
    pub max_entries: usize,
    pub default_page_size: usize,
    /// Largest page a tool caller may request.
    pub max_page_size: usize,
    pub cleanup_interval_secs: u64,
    pub enable_cleanup_task: bool,
    /// Ceiling on pages fetched by one drain.
    pub max_drain_iterations: usize,
    /// Key prefix for shared backing stores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Default for ContinuationSection {
    fn default() -> Self {
        Self {
            default_ttl_secs: config_defaults::DEFAULT_TTL_SECS,
            max_entries: config_defaults::MAX_ENTRIES,
            default_page_size: config_defaults::DEFAULT_PAGE_SIZE,
            max_page_size: config_defaults::MAX_PAGE_SIZE,
            cleanup_interval_secs: config_defaults::CLEANUP_INTERVAL_SECS,
            enable_cleanup_task: true,
            max_drain_iterations: config_defaults::MAX_DRAIN_ITERATIONS,
            namespace: None,
        }
    }
}

impl ContinuationSection {
    /// Check values the store and tools cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl_secs == 0 {
            return Err(ConfigError::invalid("default_ttl_secs", "must be at least 1"));
        }
        if self.default_ttl_secs > config_defaults::MAX_DURATION_SECS {
            return Err(ConfigError::invalid(
                "default_ttl_secs",
                format!("must be at most {}", config_defaults::MAX_DURATION_SECS),
            ));
        }
        if self.max_entries == 0 {
            return Err(ConfigError::invalid("max_entries", "must be at least 1"));
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::invalid("default_page_size", "must be at least 1"));
        }
        if self.max_page_size < self.default_page_size {
            return Err(ConfigError::invalid(
                "max_page_size",
                format!(
                    "{} is smaller than default_page_size ({})",
                    self.max_page_size, self.default_page_size
                ),
            ));
        }
        if self.enable_cleanup_task && self.cleanup_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "cleanup_interval_secs",
                "must be at least 1 when the cleanup task is enabled",
            ));
        }
        if self.enable_cleanup_task && self.cleanup_interval_secs > config_defaults::MAX_DURATION_SECS
        {
            return Err(ConfigError::invalid(
                "cleanup_interval_secs",
                format!("must be at most {}", config_defaults::MAX_DURATION_SECS),
            ));
        }
        if self.max_drain_iterations == 0 {
            return Err(ConfigError::invalid("max_drain_iterations", "must be at least 1"));
        }
        if let Some(ref ns) = self.namespace
            && ns.trim().is_empty()
        {
            return Err(ConfigError::invalid("namespace", "must not be blank"));
        }
        Ok(())
    }

    /// Validate and build the store configuration.
    pub fn to_store_config(&self) -> Result<StoreConfig> {
        self.validate()?;
        Ok(StoreConfig::from_provider(self))
    }
}

impl ConfigProvider for ContinuationSection {}

impl HasContinuationConfig for ContinuationSection {
    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    fn default_ttl(&self) -> Option<Duration> {
        Some(Duration::from_secs(self.default_ttl_secs))
    }

    fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    fn cleanup_enabled(&self) -> bool {
        self.enable_cleanup_task
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    fn max_drain_iterations(&self) -> usize {
        self.max_drain_iterations
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write JSON logs to a daily file under the log directory.
    pub file: bool,
    /// Override the log directory (default: platform data dir).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<std::path::PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: true,
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = FolioConfig::from_toml("").unwrap();
        assert!(config.continuation.is_none());
        assert_eq!(config.continuation(), ContinuationSection::default());
        assert!(config.logging().file);
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config = FolioConfig::from_toml(
            r#"
[continuation]
max_entries = 2
default_ttl_secs = 60
"#,
        )
        .unwrap();
        let section = config.continuation();
        assert_eq!(section.max_entries, 2);
        assert_eq!(section.default_ttl_secs, 60);
        assert_eq!(section.default_page_size, config_defaults::DEFAULT_PAGE_SIZE);
        assert!(section.enable_cleanup_task);
    }

    #[test]
    fn test_to_store_config() {
        let section = ContinuationSection {
            default_ttl_secs: 30,
            max_entries: 5,
            default_page_size: 4,
            namespace: Some("agents".to_string()),
            ..Default::default()
        };
        let store = section.to_store_config().unwrap();
        assert_eq!(store.max_entries, 5);
        assert_eq!(store.default_page_size, 4);
        assert_eq!(store.default_ttl, Some(Duration::from_secs(30)));
        assert_eq!(store.storage_key("q"), "agents:q");
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            (
                ContinuationSection {
                    max_entries: 0,
                    ..Default::default()
                },
                "max_entries",
            ),
            (
                ContinuationSection {
                    default_ttl_secs: 0,
                    ..Default::default()
                },
                "default_ttl_secs",
            ),
            (
                ContinuationSection {
                    default_page_size: 50,
                    max_page_size: 10,
                    ..Default::default()
                },
                "max_page_size",
            ),
            (
                ContinuationSection {
                    cleanup_interval_secs: 0,
                    ..Default::default()
                },
                "cleanup_interval_secs",
            ),
            (
                ContinuationSection {
                    default_ttl_secs: u64::MAX,
                    ..Default::default()
                },
                "default_ttl_secs",
            ),
            (
                ContinuationSection {
                    cleanup_interval_secs: u64::MAX,
                    ..Default::default()
                },
                "cleanup_interval_secs",
            ),
            (
                ContinuationSection {
                    namespace: Some(" ".into()),
                    ..Default::default()
                },
                "namespace",
            ),
        ];

        for (section, expected) in cases {
            match section.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected invalid {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_cleanup_interval_ignored_when_disabled() {
        let section = ContinuationSection {
            enable_cleanup_task: false,
            cleanup_interval_secs: 0,
            ..Default::default()
        };
        assert!(section.validate().is_ok());
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut config = FolioConfig::new();
        config.continuation = Some(ContinuationSection {
            max_entries: 42,
            ..Default::default()
        });
        let text = config.to_toml().unwrap();
        assert!(text.contains("[continuation]"));
        assert_eq!(FolioConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_merge_overrides_sections() {
        let mut base = FolioConfig::from_toml("[continuation]\nmax_entries = 1\n").unwrap();
        let top = FolioConfig::from_toml("[logging]\nfile = false\n").unwrap();
        base.merge(top);
        assert_eq!(base.continuation().max_entries, 1);
        assert!(!base.logging().file);
    }
}
