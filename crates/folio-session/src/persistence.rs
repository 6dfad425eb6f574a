//! Persistence hooks for mirroring sessions into a backing store.
//!
//! The store itself is purely in-memory. A [`PersistenceHook`] lets a
//! shared backing store (a distributed cache, a database table) follow
//! along, so sessions can outlive a process restart or be served by another
//! instance. Hook keys are already namespaced with
//! [`StoreConfig::namespace`](crate::StoreConfig::namespace).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;

/// Why a session left the store without an explicit `remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Idle longer than its TTL.
    Expired,
    /// Least recently used at capacity.
    Capacity,
}

impl std::fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired => f.write_str("expired"),
            Self::Capacity => f.write_str("capacity"),
        }
    }
}

/// Everything needed to restore a session elsewhere.
///
/// `items` never change within a `generation`; backends can write them once
/// per generation and only update `offset` afterwards. A save whose
/// generation is older than the stored one is stale and should be dropped.
#[derive(Debug, Clone)]
pub struct SessionSnapshot<T> {
    pub session_key: String,
    pub generation: u64,
    pub items: Arc<[T]>,
    pub offset: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ttl: Option<Duration>,
}

impl<T> SessionSnapshot<T> {
    /// Whether the snapshot is past its TTL by wall-clock time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.updated_at.checked_add_signed(ttl))
            .is_some_and(|deadline| deadline < now)
    }
}

/// Trait for persistence backends.
///
/// All methods are synchronous and must be quick. They run while the store
/// index is locked, so a hook must never call back into the store.
pub trait PersistenceHook<T>: Send + Sync {
    /// Load a session that is not in memory.
    ///
    /// Return `Ok(None)` if the backend does not know the key.
    fn load(&self, storage_key: &str) -> Result<Option<SessionSnapshot<T>>>;

    /// Save the current state of a session after `put` or a page read.
    fn save(&self, storage_key: &str, snapshot: &SessionSnapshot<T>) -> Result<()>;

    /// Delete a session that was removed, evicted or found expired.
    fn delete(&self, storage_key: &str) -> Result<()>;

    /// Called after `delete` when a session is evicted by TTL or capacity.
    ///
    /// Default implementation does nothing.
    fn on_evict(&self, _storage_key: &str, _reason: EvictionReason) -> Result<()> {
        Ok(())
    }
}

/// A no-op persistence hook for in-memory only caching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

impl<T> PersistenceHook<T> for NoPersistence {
    fn load(&self, _storage_key: &str) -> Result<Option<SessionSnapshot<T>>> {
        Ok(None)
    }

    fn save(&self, _storage_key: &str, _snapshot: &SessionSnapshot<T>) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _storage_key: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(updated_at: DateTime<Utc>, ttl: Option<Duration>) -> SessionSnapshot<u32> {
        SessionSnapshot {
            session_key: "q".to_string(),
            generation: 1,
            items: Arc::from(vec![1, 2, 3]),
            offset: 0,
            created_at: updated_at,
            updated_at,
            ttl,
        }
    }

    #[test]
    fn test_snapshot_expiry() {
        let now = Utc::now();
        let stale = snapshot(now - chrono::Duration::seconds(120), Some(Duration::from_secs(60)));
        assert!(stale.is_expired_at(now));

        let fresh = snapshot(now - chrono::Duration::seconds(30), Some(Duration::from_secs(60)));
        assert!(!fresh.is_expired_at(now));

        let forever = snapshot(now - chrono::Duration::days(30), None);
        assert!(!forever.is_expired_at(now));
    }

    #[test]
    fn test_snapshot_with_huge_ttl_never_expires() {
        let now = Utc::now();
        let years = Duration::from_secs(200 * 365 * 24 * 60 * 60);
        assert!(!snapshot(now, Some(years)).is_expired_at(now));
        assert!(!snapshot(now, Some(Duration::MAX)).is_expired_at(now));
    }

    #[test]
    fn test_no_persistence_loads_nothing() {
        let hook = NoPersistence;
        let loaded = PersistenceHook::<u32>::load(&hook, "q").unwrap();
        assert!(loaded.is_none());
    }
}
