//! Configuration traits for decoupled config passing between crates.
//!
//! The session store and continuation service depend on these capabilities
//! rather than on the TOML file model in `folio-config`.

use std::time::Duration;

/// Base trait for all configuration types.
pub trait ConfigProvider: Clone + Send + Sync + 'static {}

/// Continuation cache configuration.
pub trait HasContinuationConfig: ConfigProvider {
    /// Maximum number of live sessions before LRU eviction.
    fn max_entries(&self) -> usize;

    /// Page size used when a caller does not supply one.
    fn default_page_size(&self) -> usize;

    /// Idle time after which a session expires (None = never).
    fn default_ttl(&self) -> Option<Duration> {
        Some(defaults::default_ttl())
    }

    /// Interval between background sweeps of expired sessions.
    fn cleanup_interval(&self) -> Duration {
        defaults::cleanup_interval()
    }

    /// Whether the background sweep task should run.
    fn cleanup_enabled(&self) -> bool {
        true
    }

    /// Key prefix for backing stores shared with other callers.
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Largest page a tool caller may request.
    fn max_page_size(&self) -> usize {
        defaults::MAX_PAGE_SIZE
    }

    /// Hard ceiling on driver iterations for a single drain.
    fn max_drain_iterations(&self) -> usize {
        defaults::MAX_DRAIN_ITERATIONS
    }
}

/// Default continuation configuration values.
pub mod defaults {
    use std::time::Duration;

    pub const MAX_ENTRIES: usize = 10_000;
    pub const DEFAULT_PAGE_SIZE: usize = 20;
    pub const MAX_PAGE_SIZE: usize = 200;
    /// 15 minutes; long enough for an agent to come back for more.
    pub const DEFAULT_TTL_SECS: u64 = 900;
    pub const CLEANUP_INTERVAL_SECS: u64 = 60;
    pub const MAX_DRAIN_ITERATIONS: usize = 10_000;
    /// Ceiling for any TTL or sweep interval (ten years).
    pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

    pub fn default_ttl() -> Duration {
        Duration::from_secs(DEFAULT_TTL_SECS)
    }

    pub fn cleanup_interval() -> Duration {
        Duration::from_secs(CLEANUP_INTERVAL_SECS)
    }

    pub fn max_duration() -> Duration {
        Duration::from_secs(MAX_DURATION_SECS)
    }
}

/// Standalone continuation configuration.
#[derive(Debug, Clone)]
pub struct ContinuationConfigProvider {
    pub max_entries: usize,
    pub default_page_size: usize,
    pub default_ttl: Option<Duration>,
    pub cleanup_interval: Duration,
    pub cleanup_enabled: bool,
    pub namespace: Option<String>,
}

impl Default for ContinuationConfigProvider {
    fn default() -> Self {
        Self {
            max_entries: defaults::MAX_ENTRIES,
            default_page_size: defaults::DEFAULT_PAGE_SIZE,
            default_ttl: Some(defaults::default_ttl()),
            cleanup_interval: defaults::cleanup_interval(),
            cleanup_enabled: true,
            namespace: None,
        }
    }
}

impl ConfigProvider for ContinuationConfigProvider {}

impl HasContinuationConfig for ContinuationConfigProvider {
    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    fn cleanup_enabled(&self) -> bool {
        self.cleanup_enabled
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}
