//! Read position within a result set.

use std::ops::Range;

/// Read position of one result set generation.
///
/// The offset only moves forward. A new generation starts with a fresh
/// cursor at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    offset: usize,
}

impl PageCursor {
    /// Cursor at the start of a result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor restored at a known offset.
    pub fn at(offset: usize) -> Self {
        Self { offset }
    }

    /// Number of items already delivered.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether every item of a `len`-item set has been delivered.
    pub fn is_exhausted(&self, len: usize) -> bool {
        self.offset >= len
    }

    /// Items still to be delivered from a `len`-item set.
    pub fn remaining(&self, len: usize) -> usize {
        len.saturating_sub(self.offset)
    }

    /// Consume the next page of up to `page_size` items.
    ///
    /// Returns the index range of the page within the set. Past the end the
    /// range is empty and the offset does not change.
    pub fn advance(&mut self, len: usize, page_size: usize) -> Range<usize> {
        let start = self.offset.min(len);
        let end = start.saturating_add(page_size).min(len);
        self.offset = self.offset.max(end);
        start..end
    }
}
