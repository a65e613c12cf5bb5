//! Bounded linear undo/redo log.

use std::collections::VecDeque;

use log::debug;

use crate::notify::HistoryStatus;
use crate::record::EditRecord;

/// Ordered records plus a cursor.
///
/// `position` counts committed records: records `[0, position)` are applied,
/// records `[position, len)` were undone and can be redone. The cursor of a
/// classic undo stack (`historyIndex`) is `position - 1`.
#[derive(Debug)]
pub struct HistoryLedger {
    records: VecDeque<EditRecord>,
    position: usize,
    limit: usize,
}

impl HistoryLedger {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::new(),
            position: 0,
            limit: limit.max(1),
        }
    }

    /// Append `record`, discarding the redo branch first and evicting the
    /// oldest record once over the limit. Timestamps are clamped so they never
    /// go backwards.
    pub fn push(&mut self, mut record: EditRecord) -> HistoryStatus {
        if self.position < self.records.len() {
            debug!(
                "discarding {} undone records",
                self.records.len() - self.position
            );
            self.records.truncate(self.position);
        }
        if let Some(last) = self.records.back() {
            record.timestamp = record.timestamp.max(last.timestamp);
        }
        self.records.push_back(record);
        self.position += 1;
        if self.records.len() > self.limit {
            self.records.pop_front();
            self.position -= 1;
        }
        self.status()
    }

    /// The record the next undo would revert.
    #[must_use]
    pub fn peek_undo(&self) -> Option<&EditRecord> {
        self.position
            .checked_sub(1)
            .and_then(|index| self.records.get(index))
    }

    /// The record the next redo would reapply.
    #[must_use]
    pub fn peek_redo(&self) -> Option<&EditRecord> {
        self.records.get(self.position)
    }

    /// Move the cursor back by one. Returns false when nothing can be undone.
    pub fn retreat(&mut self) -> bool {
        if self.position == 0 {
            return false;
        }
        self.position -= 1;
        true
    }

    /// Move the cursor forward by one. Returns false when nothing can be redone.
    pub fn advance(&mut self) -> bool {
        if self.position >= self.records.len() {
            return false;
        }
        self.position += 1;
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.position < self.records.len()
    }

    #[must_use]
    pub fn status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            count: self.position,
        }
    }

    /// Applied records, oldest first. Undone records are excluded.
    pub fn committed(&self) -> impl Iterator<Item = &EditRecord> {
        self.records.range(..self.position)
    }

    /// Every held record, oldest first, including the redo branch.
    pub fn held(&self) -> impl Iterator<Item = &EditRecord> {
        self.records.iter()
    }

    /// `historyIndex` of the classic formulation: `None` for -1.
    #[must_use]
    pub fn history_index(&self) -> Option<usize> {
        self.position.checked_sub(1)
    }

    /// Records physically held, including undone ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) -> HistoryStatus {
        self.records.clear();
        self.position = 0;
        self.status()
    }
}
