//! # Undo/Redo Stack
//!
//! Linear history of full-document snapshots with a cursor.
//!
//! ## Design
//!
//! - `record` stores the pre-mutation snapshot and discards anything after
//!   the cursor (a fresh edit loses redo history)
//! - The first undo from the top pushes the live document as a redo anchor
//! - The stack holds at most `limit` entries, the redo anchor included; the
//!   oldest is evicted first and the cursor shifts with it
//!
//! The cursor satisfies `-1 <= index < len`.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = HistoryStack::new(50);
//! history.record(doc.clone());
//! doc = mutated;
//!
//! if let Some(previous) = history.undo(doc.clone()) {
//!     doc = previous;
//! }
//! ```

use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Bounded undo/redo stack over snapshots
#[derive(Debug, Clone)]
pub struct HistoryStack<T> {
    entries: VecDeque<T>,

    /// Position of the snapshot the next undo restores, `-1` when exhausted
    index: isize,

    /// Whether the last entry is the live document pushed by an undo
    anchored: bool,

    limit: usize,
}

impl<T: Clone> HistoryStack<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: -1,
            anchored: false,
            // one snapshot plus the redo anchor
            limit: limit.max(2),
        }
    }

    /// Record the snapshot taken before a mutation
    pub fn record(&mut self, snapshot: T) {
        self.entries.truncate((self.index + 1) as usize);
        self.anchored = false;

        self.entries.push_back(snapshot);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.index = self.entries.len() as isize - 1;
    }

    /// Step back, returning the snapshot to restore.
    ///
    /// `live` is the current document; it becomes the redo anchor when the
    /// cursor is at the top.
    pub fn undo(&mut self, live: T) -> Option<T> {
        if !self.can_undo() {
            return None;
        }
        if !self.anchored && self.index == self.entries.len() as isize - 1 {
            self.entries.push_back(live);
            self.anchored = true;
            if self.entries.len() > self.limit {
                self.entries.pop_front();
                self.index -= 1;
            }
        }

        let snapshot = self.entries.get(self.index as usize).cloned();
        self.index -= 1;
        snapshot
    }

    /// Step forward, returning the snapshot to restore
    pub fn redo(&mut self) -> Option<T> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        let next = (self.index + 1) as usize;

        let snapshot = self.entries.get(next).cloned();
        if self.anchored && next == self.entries.len() - 1 {
            self.entries.pop_back();
            self.anchored = false;
        }
        snapshot
    }

    pub fn can_undo(&self) -> bool {
        self.index >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.entries.len() as isize - 1
    }

    /// Stored snapshots, the redo anchor included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> isize {
        self.index
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = -1;
        self.anchored = false;
    }
}

impl<T: Clone> Default for HistoryStack<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
