//! # Temporary Highlight
//!
//! Flashes a highlight over a span of lines and clears it after a delay.
//!
//! There are no background threads: timers sit in a [`TimerQueue`] and fire
//! when the owner calls `take_due` (the editor's `tick`). Each timer has a
//! key; scheduling the same key again replaces the pending timer, which is
//! how a newer highlight supersedes an older one before it expires. The
//! range a timer will act on is mapped through every commit made while it
//! is pending.

use crate::document::Document;
use crate::mutations::{Assoc, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highlight 1-based, inclusive `start_line..=end_line`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRequest {
    pub start_line: usize,
    pub end_line: usize,

    /// Falls back to the configured default color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl HighlightRequest {
    pub fn lines(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Resolve a line span to `[from, to)`.
///
/// Lines past the end of the document leave the bound at 0, so an
/// unresolvable request comes back empty.
pub fn resolve_lines(doc: &Document, start_line: usize, end_line: usize) -> (usize, usize) {
    let text = doc.text();
    let (mut from, mut to) = (0, 0);
    let mut offset = 0;
    for (index, line) in text.split('\n').enumerate() {
        let len = line.chars().count();
        if index + 1 == start_line {
            from = offset;
        }
        if index + 1 == end_line {
            to = offset + len;
            break;
        }
        offset += len + 1;
    }
    (from, to)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerKey {
    ClearHighlight,
}

/// A scheduled action over a document range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub key: TimerKey,
    pub due: DateTime<Utc>,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `timer`, replacing a pending one with the same key.
    ///
    /// Returns the superseded timer, if any.
    pub fn schedule(&mut self, timer: Timer) -> Option<Timer> {
        let superseded = self
            .timers
            .iter()
            .position(|pending| pending.key == timer.key)
            .map(|index| self.timers.remove(index));
        self.timers.push(timer);
        superseded
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<Timer> {
        let (mut due, pending): (Vec<_>, Vec<_>) = self.timers.drain(..).partition(|timer| timer.due <= now);
        self.timers = pending;
        due.sort_by_key(|timer| timer.due);
        due
    }

    /// Keep pending ranges attached to the same content across a commit
    pub fn map_through(&mut self, steps: &[Step]) {
        for timer in &mut self.timers {
            for step in steps {
                let from = step.map(timer.from, Assoc::After);
                let to = step.map(timer.to, Assoc::Before);
                timer.from = from;
                timer.to = to.max(from);
            }
        }
    }

    pub fn pending(&self) -> &[Timer] {
        &self.timers
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}
