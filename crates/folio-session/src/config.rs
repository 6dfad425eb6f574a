//! Configuration for the session store.

use std::time::Duration;

use folio_types::{HasContinuationConfig, config_defaults};

use crate::error::{Error, Result};

/// Default number of items returned by a page read.
pub const DEFAULT_PAGE_SIZE: usize = config_defaults::DEFAULT_PAGE_SIZE;

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of sessions held before LRU eviction.
    pub max_entries: usize,

    /// Idle time after which a session expires.
    /// Individual sessions may override this at insert time.
    pub default_ttl: Option<Duration>,

    /// Page size used when a caller does not supply one.
    pub default_page_size: usize,

    /// Prefix applied to keys handed to the persistence hook.
    pub namespace: Option<String>,

    /// Whether to run periodic cleanup of expired sessions.
    /// If false, expired sessions are only cleaned up on access.
    pub enable_cleanup_task: bool,

    /// Interval for the cleanup task (if enabled).
    pub cleanup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: config_defaults::MAX_ENTRIES,
            default_ttl: Some(config_defaults::default_ttl()),
            default_page_size: DEFAULT_PAGE_SIZE,
            namespace: None,
            enable_cleanup_task: true,
            cleanup_interval: config_defaults::cleanup_interval(),
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store configuration from any continuation config provider.
    pub fn from_provider<C: HasContinuationConfig>(provider: &C) -> Self {
        Self {
            max_entries: provider.max_entries(),
            default_ttl: provider.default_ttl(),
            default_page_size: provider.default_page_size(),
            namespace: provider.namespace().map(String::from),
            enable_cleanup_task: provider.cleanup_enabled(),
            cleanup_interval: provider.cleanup_interval(),
        }
    }

    /// Set the maximum number of sessions.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set the default TTL for sessions.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Disable TTL (sessions don't expire based on time).
    pub fn without_ttl(mut self) -> Self {
        self.default_ttl = None;
        self
    }

    /// Set the fallback page size.
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Set the key namespace used for persistence.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Enable or disable the background cleanup task.
    pub fn with_cleanup_task(mut self, enabled: bool) -> Self {
        self.enable_cleanup_task = enabled;
        self
    }

    /// Set the cleanup interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Check that the configuration describes a usable store.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(Error::InvalidConfig(
                "max_entries must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 {
            return Err(Error::InvalidConfig(
                "default_page_size must be at least 1".to_string(),
            ));
        }
        if self.default_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(Error::InvalidConfig(
                "default_ttl must be positive (omit it to disable expiry)".to_string(),
            ));
        }
        if self.default_ttl.is_some_and(|ttl| ttl > config_defaults::max_duration()) {
            return Err(Error::InvalidConfig(format!(
                "default_ttl must be at most {} seconds",
                config_defaults::MAX_DURATION_SECS
            )));
        }
        if self.enable_cleanup_task {
            if self.cleanup_interval.is_zero() {
                return Err(Error::InvalidConfig(
                    "cleanup_interval must be positive".to_string(),
                ));
            }
            if self.cleanup_interval > config_defaults::max_duration() {
                return Err(Error::InvalidConfig(format!(
                    "cleanup_interval must be at most {} seconds",
                    config_defaults::MAX_DURATION_SECS
                )));
            }
        }
        if self
            .namespace
            .as_deref()
            .is_some_and(|ns| ns.trim().is_empty())
        {
            return Err(Error::InvalidConfig("namespace must not be empty".to_string()));
        }
        Ok(())
    }

    /// Key under which `session_key` is stored in a shared backing store.
    pub fn storage_key(&self, session_key: &str) -> String {
        match self.namespace {
            Some(ref ns) => format!("{ns}:{session_key}"),
            None => session_key.to_string(),
        }
    }
}
