//! # Undo/Redo Stack
//!
//! Records committed batches with their inverses.
//!
//! ## Design
//!
//! - Each commit records the steps that were actually applied (after
//!   interception) and their inverses in undo order
//! - Undo hands back the inverses as an `Origin::History` batch; the entry
//!   only moves to the redo stack once that batch committed
//! - Redo hands back the original steps, also tagged `Origin::History`
//! - New commits clear the redo stack
//! - `begin_batch`/`end_batch` group several commits into one undo step
//!
//! Because replays are tagged as history, the interceptor lets them through:
//! undoing a tracked deletion removes the Deletion annotation instead of
//! tracking the removal of the retained text.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! stack.record(HistoryEntry::new(steps, inverses, before, after));
//!
//! stack.undo(|batch| pipeline.commit(&batch.steps))?;
//! stack.redo(|batch| pipeline.commit(&batch.steps))?;
//! ```

use crate::mutations::{Batch, Origin, Selection, Step};

/// One undo step: a commit, or several grouped commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Steps as committed (in application order)
    pub steps: Vec<Step>,

    /// Inverse steps (in undo order)
    pub inverses: Vec<Step>,

    /// Selection to restore on undo
    pub selection_before: Selection,

    /// Selection to restore on redo
    pub selection_after: Selection,

    /// Label shown for this step ("accept 2 changes")
    pub description: Option<String>,
}

impl HistoryEntry {
    pub fn new(
        steps: Vec<Step>,
        inverses: Vec<Step>,
        selection_before: Selection,
        selection_after: Selection,
    ) -> Self {
        Self {
            steps,
            inverses,
            selection_before,
            selection_after,
            description: None,
        }
    }

    /// Fold a later commit into this entry
    fn absorb(&mut self, later: HistoryEntry) {
        self.steps.extend(later.steps);
        let mut inverses = later.inverses;
        inverses.append(&mut self.inverses);
        self.inverses = inverses;
        self.selection_after = later.selection_after;
        if self.description.is_none() {
            self.description = later.description;
        }
    }

    fn undo_batch(&self) -> Batch {
        Batch::new(self.inverses.clone())
            .with_selection(self.selection_before)
            .with_origin(Origin::History)
    }

    fn redo_batch(&self) -> Batch {
        Batch::new(self.steps.clone())
            .with_selection(self.selection_after)
            .with_origin(Origin::History)
    }
}

/// Undo/redo stack for document editing
#[derive(Debug)]
pub struct UndoStack {
    /// Applied entries (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone entries (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently building a group
    current_batch: Option<HistoryEntry>,

    /// Nesting depth of `begin_batch` calls
    depth: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
            depth: 0,
        }
    }

    /// Record a commit
    pub fn record(&mut self, entry: HistoryEntry) {
        if entry.steps.is_empty() {
            return;
        }
        if self.depth > 0 {
            match &mut self.current_batch {
                Some(group) => group.absorb(entry),
                None => self.current_batch = Some(entry),
            }
            self.redo_stack.clear();
        } else {
            self.push_entry(entry);
        }
    }

    /// Start grouping commits (nests; only the outermost `end_batch` closes the group)
    pub fn begin_batch(&mut self) {
        self.depth += 1;
    }

    /// Close the current group and push it as one entry
    pub fn end_batch(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth == 0 {
            if let Some(group) = self.current_batch.take() {
                self.push_entry(group);
            }
        }
    }

    /// Label the most recent step, or the open group when grouping
    pub fn describe_last(&mut self, description: impl Into<String>) {
        let entry = match &mut self.current_batch {
            Some(group) => Some(group),
            None => self.undo_stack.last_mut(),
        };
        if let Some(entry) = entry {
            entry.description = Some(description.into());
        }
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Undo the most recent entry by committing its inverse batch through `commit`.
    ///
    /// Returns `Ok(None)` when there is nothing to undo. The entry stays put if
    /// `commit` fails.
    pub fn undo<T, E>(&mut self, commit: impl FnOnce(Batch) -> Result<T, E>) -> Result<Option<T>, E> {
        self.end_open_group();
        let Some(entry) = self.undo_stack.last() else {
            return Ok(None);
        };
        let result = commit(entry.undo_batch())?;
        if let Some(entry) = self.undo_stack.pop() {
            self.redo_stack.push(entry);
        }
        Ok(Some(result))
    }

    /// Redo the most recently undone entry
    pub fn redo<T, E>(&mut self, commit: impl FnOnce(Batch) -> Result<T, E>) -> Result<Option<T>, E> {
        self.end_open_group();
        let Some(entry) = self.redo_stack.last() else {
            return Ok(None);
        };
        let result = commit(entry.redo_batch())?;
        if let Some(entry) = self.redo_stack.pop() {
            self.undo_stack.push(entry);
        }
        Ok(Some(result))
    }

    fn end_open_group(&mut self) {
        if self.depth > 0 {
            self.depth = 1;
            self.end_batch();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.current_batch.is_some()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
        self.depth = 0;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
