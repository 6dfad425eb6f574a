//! Protocol types returned by the continuation service.

use folio_session::PageOutcome;
use serde::Serialize;

/// One page of a session's result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Items in this page, in result-set order.
    pub items: Vec<T>,
    /// Items delivered so far, including this page.
    pub offset: usize,
    /// Total items in the result set.
    pub total: usize,
    /// Whether every item has now been delivered.
    pub exhausted: bool,
    /// Generation of the result set this page was cut from.
    pub generation: u64,
}

impl<T> Page<T> {
    /// Whether a further `next` call can return items.
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> From<PageOutcome<T>> for Page<T> {
    fn from(outcome: PageOutcome<T>) -> Self {
        Self {
            items: outcome.items,
            offset: outcome.offset,
            total: outcome.total,
            exhausted: outcome.exhausted,
            generation: outcome.generation,
        }
    }
}

/// Acknowledgement of a `start` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReceipt {
    pub session_key: String,
    /// Generation of the stored result set; later starts get larger numbers.
    pub generation: u64,
    /// Number of items stored.
    pub total: usize,
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No record (never started, reset, or evicted).
    Empty,
    /// Items remain to be delivered.
    Active { offset: usize, total: usize },
    /// Every item has been delivered.
    Exhausted { total: usize },
}
