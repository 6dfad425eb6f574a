//! Stored result sets and the snapshots handed back to callers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::cursor::PageCursor;

/// An immutable, ordered result set produced once per session.
///
/// Cloning is cheap: items are shared.
#[derive(Debug, Clone)]
pub struct ResultSet<T> {
    session_key: String,
    items: Arc<[T]>,
    created_at: DateTime<Utc>,
    generation: u64,
}

impl<T> ResultSet<T> {
    /// Create a result set for a new generation.
    pub fn new(session_key: impl Into<String>, items: Vec<T>, generation: u64) -> Self {
        Self {
            session_key: session_key.into(),
            items: Arc::from(items),
            created_at: Utc::now(),
            generation,
        }
    }

    /// Rebuild a result set from persisted parts.
    pub fn from_parts(
        session_key: impl Into<String>,
        items: Arc<[T]>,
        created_at: DateTime<Utc>,
        generation: u64,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            items,
            created_at,
            generation,
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Shared handle to the items.
    pub fn shared_items(&self) -> Arc<[T]> {
        Arc::clone(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Store-wide sequence number of the `put` that created this set.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Point-in-time view of a stored session.
#[derive(Debug, Clone)]
pub struct SessionEntry<T> {
    pub result_set: ResultSet<T>,
    pub cursor: PageCursor,
    pub last_access_at: Instant,
    pub access_seq: u64,
    pub ttl: Option<Duration>,
}

impl<T> SessionEntry<T> {
    /// Whether every item has been delivered.
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted(self.result_set.len())
    }

    /// Items not yet delivered.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining(self.result_set.len())
    }
}

/// Result of consuming one page from a session.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome<T> {
    /// Items in this page, in result-set order.
    pub items: Vec<T>,
    /// Cursor offset after this page.
    pub offset: usize,
    /// Total items in the result set.
    pub total: usize,
    /// Whether the set is fully delivered after this page.
    pub exhausted: bool,
    /// Generation the page was read from.
    pub generation: u64,
}
