//! Session store with LRU eviction, TTL expiry and per-key page reads.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::cursor::PageCursor;
use crate::entry::{PageOutcome, ResultSet, SessionEntry};
use crate::error::{Error, Result};
use crate::persistence::{EvictionReason, NoPersistence, PersistenceHook, SessionSnapshot};
use crate::ttl::{AccessRecord, TtlTracker};

/// Longest accepted session key, in bytes.
pub const MAX_KEY_LEN: usize = 512;

/// Reject keys that cannot name a session.
pub fn validate_key(session_key: &str) -> Result<()> {
    if session_key.trim().is_empty() || session_key.len() > MAX_KEY_LEN {
        let shown: String = session_key.chars().take(64).collect();
        return Err(Error::InvalidKey(shown));
    }
    Ok(())
}

/// One live session. Guarded by its own lock so page reads on different
/// keys never wait on each other.
#[derive(Debug)]
struct Slot<T> {
    result_set: ResultSet<T>,
    cursor: PageCursor,
}

type SharedSlot<T> = Arc<tokio::sync::Mutex<Slot<T>>>;

/// Key index protected by a short-lived mutex. Never held across an await.
struct Index<T> {
    /// LRU order over live sessions.
    slots: LruCache<String, SharedSlot<T>>,

    /// Access times for expiration.
    ttl: TtlTracker,

    /// Last generation handed out.
    generation: u64,
}

impl<T> Index<T> {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn evict(&mut self, session_key: &str) -> bool {
        self.ttl.remove(session_key);
        self.slots.pop(session_key).is_some()
    }

    /// Whether `slot` is still the one stored under `session_key`.
    fn is_current(&self, session_key: &str, slot: &SharedSlot<T>) -> bool {
        self.slots
            .peek(session_key)
            .is_some_and(|live| Arc::ptr_eq(live, slot))
    }

    /// Make room for one new key. Expired sessions go first, then the
    /// least recently used ones.
    fn make_room(&mut self, capacity: usize, now: Instant) -> Vec<(String, EvictionReason)> {
        let mut evicted = Vec::new();
        if self.slots.len() < capacity {
            return evicted;
        }

        for key in self.ttl.expired_keys(now) {
            if self.evict(&key) {
                evicted.push((key, EvictionReason::Expired));
            }
        }

        while self.slots.len() >= capacity {
            let Some((key, _)) = self.slots.pop_lru() else {
                break;
            };
            self.ttl.remove(&key);
            evicted.push((key, EvictionReason::Capacity));
        }

        evicted
    }
}

enum Lookup<T> {
    Live(SharedSlot<T>, AccessRecord),
    Expired,
    Missing,
}

/// Session store with LRU eviction, optional TTL and persistence hooks.
///
/// This store provides:
/// - LRU eviction when max capacity is reached
/// - Per-entry TTL expiry, checked lazily on access and by [`sweep`](Self::sweep)
/// - Serializable page reads per key via a per-session lock
/// - Persistence hooks for mirroring sessions into a backing store
///
/// Every operation is a fresh lookup by key; callers never hold on to a
/// live entry, only to snapshots.
///
/// Persistence hooks run under the index lock, so the backing store sees
/// saves and deletes in the same order as the in-memory changes.
pub struct SessionStore<T, P = NoPersistence> {
    index: Arc<Mutex<Index<T>>>,
    persistence: Arc<P>,
    config: StoreConfig,
}

impl<T> SessionStore<T, NoPersistence>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an in-memory store.
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::with_persistence(config, NoPersistence)
    }
}

impl<T, P> SessionStore<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: PersistenceHook<T> + 'static,
{
    /// Create a store with a persistence backend.
    pub fn with_persistence(config: StoreConfig, persistence: P) -> Result<Self> {
        config.validate()?;
        let cap = NonZeroUsize::new(config.max_entries)
            .ok_or_else(|| Error::InvalidConfig("max_entries must be at least 1".to_string()))?;

        let index = Index {
            slots: LruCache::new(cap),
            ttl: TtlTracker::new(),
            generation: 0,
        };

        Ok(Self {
            index: Arc::new(Mutex::new(index)),
            persistence: Arc::new(persistence),
            config,
        })
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get the persistence backend.
    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Get the current number of sessions (expired ones included until swept).
    pub fn len(&self) -> usize {
        self.index.lock().slots.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.index.lock().slots.is_empty()
    }

    /// Check if a live session exists, without touching it or loading it.
    pub fn contains(&self, session_key: &str) -> bool {
        let index = self.index.lock();
        index.slots.contains(session_key) && !index.ttl.is_expired(session_key, Instant::now())
    }

    /// Store a result set under `session_key` with the default TTL.
    ///
    /// Replaces any previous result set for the key (never merges) and
    /// starts a fresh cursor.
    pub async fn put(&self, session_key: &str, items: Vec<T>) -> Result<ResultSet<T>> {
        self.put_with_ttl(session_key, items, self.config.default_ttl)
            .await
    }

    /// Store a result set with an explicit TTL (None = never expires).
    pub async fn put_with_ttl(
        &self,
        session_key: &str,
        items: Vec<T>,
        ttl: Option<Duration>,
    ) -> Result<ResultSet<T>> {
        validate_key(session_key)?;
        let items: Arc<[T]> = Arc::from(items);
        let created_at = Utc::now();

        let mut index = self.index.lock();
        let replaced = index.slots.contains(session_key);
        if !replaced {
            let evicted = index.make_room(self.config.max_entries, Instant::now());
            self.notify_evicted(&evicted);
        }

        let generation = index.next_generation();
        let result_set = ResultSet::from_parts(session_key, items, created_at, generation);
        let slot = Slot {
            result_set: result_set.clone(),
            cursor: PageCursor::new(),
        };
        index
            .slots
            .put(session_key.to_string(), Arc::new(tokio::sync::Mutex::new(slot)));
        index.ttl.track(session_key, ttl);
        self.persist(&result_set, PageCursor::new(), ttl);
        drop(index);

        debug!(
            session_key = %session_key,
            generation,
            items = result_set.len(),
            replaced,
            "Result set stored"
        );
        Ok(result_set)
    }

    /// Read a session without refreshing its access time or LRU position.
    pub async fn get(&self, session_key: &str) -> Result<SessionEntry<T>> {
        let (slot, record) = self.resolve(session_key, false)?;
        let slot = slot.lock().await;
        Ok(SessionEntry {
            result_set: slot.result_set.clone(),
            cursor: slot.cursor,
            last_access_at: record.last_access,
            access_seq: record.seq,
            ttl: record.ttl,
        })
    }

    /// Refresh a session's access time and LRU position.
    pub async fn touch(&self, session_key: &str) -> Result<()> {
        self.resolve(session_key, true).map(|_| ())
    }

    /// Touch a session and report how many items are left to deliver.
    pub async fn remaining(&self, session_key: &str) -> Result<usize> {
        let (slot, _) = self.resolve(session_key, true)?;
        let slot = slot.lock().await;
        Ok(slot.cursor.remaining(slot.result_set.len()))
    }

    /// Consume the next page of up to `page_size` items.
    ///
    /// Concurrent calls on the same key are serialized: each gets a
    /// disjoint page. Past the end the page is empty and `exhausted` is set.
    pub async fn advance(&self, session_key: &str, page_size: usize) -> Result<PageOutcome<T>> {
        let (slot, record) = self.resolve(session_key, true)?;
        let mut guard = slot.lock().await;
        let entry = &mut *guard;

        let total = entry.result_set.len();
        let range = entry.cursor.advance(total, page_size.max(1));
        let items = entry.result_set.items()[range].to_vec();
        let outcome = PageOutcome {
            items,
            offset: entry.cursor.offset(),
            total,
            exhausted: entry.cursor.is_exhausted(total),
            generation: entry.result_set.generation(),
        };

        trace!(
            session_key = %session_key,
            offset = outcome.offset,
            page_len = outcome.items.len(),
            total,
            "Page consumed"
        );

        // Only the live slot may write back. A slot removed or replaced
        // while this page was cut is already gone from the backing store.
        let index = self.index.lock();
        if index.is_current(session_key, &slot) {
            self.persist(&entry.result_set, entry.cursor, record.ttl);
        } else {
            debug!(session_key = %session_key, "Session replaced during page read, not saved");
        }
        drop(index);

        Ok(outcome)
    }

    /// Remove a session from memory and from the backing store.
    ///
    /// Returns whether the session was in memory.
    pub async fn remove(&self, session_key: &str) -> Result<bool> {
        validate_key(session_key)?;
        let mut index = self.index.lock();
        let existed = index.evict(session_key);
        self.delete_persisted(session_key);
        drop(index);

        if existed {
            debug!(session_key = %session_key, "Session removed");
        }
        Ok(existed)
    }

    /// Remove a session only if it still holds result set `generation`.
    ///
    /// A session restarted under the same key since `generation` was read
    /// is left alone. Returns whether anything was removed.
    pub async fn remove_generation(&self, session_key: &str, generation: u64) -> Result<bool> {
        validate_key(session_key)?;
        let Some(slot) = self.index.lock().slots.peek(session_key).cloned() else {
            return Ok(false);
        };

        let guard = slot.lock().await;
        if guard.result_set.generation() != generation {
            debug!(
                session_key = %session_key,
                expected = generation,
                current = guard.result_set.generation(),
                "Session restarted, not removed"
            );
            return Ok(false);
        }

        let mut index = self.index.lock();
        if !index.is_current(session_key, &slot) {
            return Ok(false);
        }
        index.evict(session_key);
        self.delete_persisted(session_key);
        drop(index);
        drop(guard);

        debug!(session_key = %session_key, generation, "Session removed");
        Ok(true)
    }

    /// Remove every expired session.
    ///
    /// Candidates are collected under one short lock; each removal then
    /// re-checks expiry under its own lock, so a session touched in between
    /// survives.
    pub async fn sweep(&self) -> usize {
        let candidates = self.index.lock().ttl.expired_keys(Instant::now());
        let mut count = 0;

        for key in candidates {
            let mut index = self.index.lock();
            if index.ttl.is_expired(&key, Instant::now()) && index.evict(&key) {
                self.notify_evicted(&[(key, EvictionReason::Expired)]);
                count += 1;
            }
        }

        if count > 0 {
            debug!(count, "Swept expired sessions");
        }
        count
    }

    /// Drop every session from memory without notifying the backend.
    pub fn clear(&self) {
        let mut index = self.index.lock();
        index.slots.clear();
        index.ttl.clear();
        debug!("Session store cleared");
    }

    /// List live session keys, most recently used first.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let index = self.index.lock();
        index
            .slots
            .iter()
            .filter(|(key, _)| !index.ttl.is_expired(key, now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        let index = self.index.lock();
        StoreStats {
            size: index.slots.len(),
            capacity: self.config.max_entries,
            ttl_tracked: index.ttl.len(),
            generations: index.generation,
        }
    }

    /// Start the periodic sweep if the configuration enables it.
    ///
    /// The task stops when `shutdown` is cancelled.
    pub fn spawn_cleanup_task(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.config.enable_cleanup_task {
            return None;
        }

        let period = self.config.cleanup_interval;
        let Some(first) = Instant::now().checked_add(period) else {
            warn!(?period, "Cleanup interval out of range, cleanup task not started");
            return None;
        };
        let store = self.clone();
        let mut ticker = tokio::time::interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Cleanup task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        store.sweep().await;
                    }
                }
            }
        }))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn lookup(&self, session_key: &str, touch: bool) -> Lookup<T> {
        let now = Instant::now();
        let mut index = self.index.lock();

        let Some(record) = index.ttl.get(session_key) else {
            return Lookup::Missing;
        };
        if record.is_expired_at(now) {
            index.evict(session_key);
            self.notify_evicted(&[(session_key.to_string(), EvictionReason::Expired)]);
            return Lookup::Expired;
        }

        if touch {
            let slot = index.slots.get(session_key).cloned();
            match (slot, index.ttl.touch(session_key)) {
                (Some(slot), Some(record)) => Lookup::Live(slot, record),
                _ => Lookup::Missing,
            }
        } else {
            match index.slots.peek(session_key).cloned() {
                Some(slot) => Lookup::Live(slot, record),
                None => Lookup::Missing,
            }
        }
    }

    /// Find a live session, expiring it lazily or restoring it from the
    /// backing store as needed.
    fn resolve(&self, session_key: &str, touch: bool) -> Result<(SharedSlot<T>, AccessRecord)> {
        validate_key(session_key)?;
        match self.lookup(session_key, touch) {
            Lookup::Live(slot, record) => Ok((slot, record)),
            Lookup::Expired => Err(Error::NotFound(session_key.to_string())),
            Lookup::Missing => self.restore(session_key),
        }
    }

    /// Bring back a session that only the backing store knows about, e.g.
    /// one saved by a previous process. Evicted sessions were deleted from
    /// the backend when they left memory, so they stay gone.
    fn restore(&self, session_key: &str) -> Result<(SharedSlot<T>, AccessRecord)> {
        let mut index = self.index.lock();

        // Another caller may have restored or replaced it meanwhile.
        if let Some(slot) = index.slots.get(session_key).cloned() {
            let record = match index.ttl.touch(session_key) {
                Some(record) => record,
                None => index.ttl.track(session_key, self.config.default_ttl),
            };
            return Ok((slot, record));
        }

        let Some(snapshot) = self.persistence.load(&self.config.storage_key(session_key))? else {
            return Err(Error::NotFound(session_key.to_string()));
        };

        if snapshot.is_expired_at(Utc::now()) {
            debug!(session_key = %session_key, "Persisted session expired, discarding");
            self.delete_persisted(session_key);
            return Err(Error::NotFound(session_key.to_string()));
        }

        let evicted = index.make_room(self.config.max_entries, Instant::now());
        self.notify_evicted(&evicted);

        index.generation = index.generation.max(snapshot.generation);
        let slot = Slot {
            result_set: ResultSet::from_parts(
                session_key,
                snapshot.items,
                snapshot.created_at,
                snapshot.generation,
            ),
            cursor: PageCursor::at(snapshot.offset),
        };
        let slot = Arc::new(tokio::sync::Mutex::new(slot));
        index
            .slots
            .put(session_key.to_string(), Arc::clone(&slot));
        let record = index.ttl.track(session_key, snapshot.ttl);
        drop(index);

        debug!(session_key = %session_key, "Session restored from persistence");
        Ok((slot, record))
    }

    fn persist(&self, result_set: &ResultSet<T>, cursor: PageCursor, ttl: Option<Duration>) {
        let snapshot = SessionSnapshot {
            session_key: result_set.session_key().to_string(),
            generation: result_set.generation(),
            items: result_set.shared_items(),
            offset: cursor.offset(),
            created_at: result_set.created_at(),
            updated_at: Utc::now(),
            ttl,
        };
        let storage_key = self.config.storage_key(result_set.session_key());
        if let Err(e) = self.persistence.save(&storage_key, &snapshot) {
            warn!(
                session_key = %result_set.session_key(),
                error = %e,
                "Failed to persist session"
            );
        }
    }

    fn delete_persisted(&self, session_key: &str) {
        if let Err(e) = self
            .persistence
            .delete(&self.config.storage_key(session_key))
        {
            warn!(session_key = %session_key, error = %e, "Failed to delete persisted session");
        }
    }

    /// Evicted sessions are gone for good: drop them from the backend too,
    /// then tell the hook why.
    fn notify_evicted(&self, evicted: &[(String, EvictionReason)]) {
        for (key, reason) in evicted {
            debug!(session_key = %key, reason = %reason, "Session evicted");
            self.delete_persisted(key);
            if let Err(e) = self
                .persistence
                .on_evict(&self.config.storage_key(key), *reason)
            {
                warn!(session_key = %key, error = %e, "Eviction hook failed");
            }
        }
    }
}

impl<T, P> Clone for SessionStore<T, P> {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
            persistence: Arc::clone(&self.persistence),
            config: self.config.clone(),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Current number of sessions in memory.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Number of sessions being tracked for TTL.
    pub ttl_tracked: usize,

    /// Number of result set generations handed out so far.
    pub generations: u64,
}
