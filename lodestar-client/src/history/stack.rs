//! Bounded back/forward stack

use std::collections::VecDeque;

use super::entry::{HistoryEntry, Viewport};
use crate::constants::DEFAULT_HISTORY_LIMIT;

/// Bounded navigation history with a cursor
///
/// Entries are ordered oldest to newest. The cursor always points at a
/// valid entry unless the stack is empty. When the bound is exceeded the
/// oldest entry is evicted.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    /// Entries, oldest first
    entries: VecDeque<HistoryEntry>,
    /// Index of the current entry (meaningless while empty)
    cursor: usize,
    /// Maximum number of entries
    bound: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryStack {
    /// Create an empty stack holding at most `bound` entries (minimum 1)
    pub fn new(bound: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            bound: bound.max(1),
        }
    }

    /// Make `entry` the current page
    ///
    /// Drops everything after the cursor, appends, then evicts from the
    /// oldest end if over the bound.
    pub fn push(&mut self, entry: HistoryEntry) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }

        self.entries.push_back(entry);

        while self.entries.len() > self.bound {
            self.entries.pop_front();
        }

        self.cursor = self.entries.len() - 1;
    }

    /// The current entry
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    /// True if there is an entry before the current one
    pub fn can_go_back(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    /// True if there is an entry after the current one
    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Move back one entry and return it
    ///
    /// Returns None, leaving the cursor unchanged, at the oldest entry.
    pub fn go_back(&mut self) -> Option<HistoryEntry> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor -= 1;
        self.current().cloned()
    }

    /// Move forward one entry and return it
    ///
    /// Returns None, leaving the cursor unchanged, at the newest entry.
    pub fn go_forward(&mut self) -> Option<HistoryEntry> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor += 1;
        self.current().cloned()
    }

    /// Record the viewport of the current entry before leaving it
    ///
    /// Returns false if the stack is empty.
    pub fn snapshot_current(&mut self, viewport: Viewport) -> bool {
        match self.entries.get_mut(self.cursor) {
            Some(entry) => {
                entry.set_viewport(viewport);
                true
            }
            None => false,
        }
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn bound(&self) -> usize {
        self.bound
    }

    /// Index of the current entry, oldest first
    #[cfg(test)]
    fn position(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.cursor)
    }

    /// URLs of all entries, oldest first
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.url.as_str())
    }
}
