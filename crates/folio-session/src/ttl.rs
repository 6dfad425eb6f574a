//! Access tracking for TTL expiry.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Last access for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    /// When the session was last put, read or touched.
    pub last_access: Instant,

    /// Store-wide access sequence number. Strictly increases on every
    /// access, even when the clock does not move.
    pub seq: u64,

    /// Idle time after which the session expires (None = never).
    pub ttl: Option<Duration>,
}

impl AccessRecord {
    /// Whether the session is past its TTL at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.ttl {
            None => false,
            Some(ttl) => now.saturating_duration_since(self.last_access) > ttl,
        }
    }
}

/// Tracks last access times for TTL-based expiration.
#[derive(Debug, Default)]
pub struct TtlTracker {
    records: HashMap<String, AccessRecord>,
    seq: u64,
}

impl TtlTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Start tracking a session with its own TTL, replacing any prior record.
    pub fn track(&mut self, session_key: &str, ttl: Option<Duration>) -> AccessRecord {
        let record = AccessRecord {
            last_access: Instant::now(),
            seq: self.next_seq(),
            ttl,
        };
        self.records.insert(session_key.to_string(), record);
        record
    }

    /// Record an access for a session (resets its TTL timer).
    pub fn touch(&mut self, session_key: &str) -> Option<AccessRecord> {
        let seq = self.next_seq();
        let record = self.records.get_mut(session_key)?;
        record.last_access = Instant::now();
        record.seq = seq;
        Some(*record)
    }

    /// Current access record, if tracked.
    pub fn get(&self, session_key: &str) -> Option<AccessRecord> {
        self.records.get(session_key).copied()
    }

    /// Check if a session has expired. Untracked sessions count as expired.
    pub fn is_expired(&self, session_key: &str, now: Instant) -> bool {
        match self.records.get(session_key) {
            None => true,
            Some(record) => record.is_expired_at(now),
        }
    }

    /// Keys of all sessions past their TTL at `now`.
    pub fn expired_keys(&self, now: Instant) -> Vec<String> {
        self.records
            .iter()
            .filter(|(_, record)| record.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove tracking for a session.
    pub fn remove(&mut self, session_key: &str) -> Option<AccessRecord> {
        self.records.remove(session_key)
    }

    /// Get the number of tracked sessions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if there are no tracked sessions.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clear all tracking data.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
