//! # Editor
//!
//! The single-writer entry point the editing surface talks to.
//!
//! Every document change goes through [`Editor::submit`]:
//!
//! ```text
//! Batch ─▶ guard ─┬─ guarded ───────────────────────────────┐
//!                 └─ intercept ─▶ reconcile caret           │
//!                                       │                   ▼
//!                                       └──────────▶ commit (atomic)
//!                                                           │
//!                     history · annotations · pending timers ◀┘
//! ```
//!
//! Review commands, undo/redo, remote changes and timer expiry all end up
//! there too, tagged with their [`Origin`] so the guard knows not to track
//! them.

use crate::annotation::AnnotationSpan;
use crate::clock::{Clock, SystemClock};
use crate::composition::{CompositionGate, CompositionPhase};
use crate::config::{EditorConfig, HighlightConfig};
use crate::cursor::reconcile_selection;
use crate::document::{Document, Highlight};
use crate::errors::EditorError;
use crate::highlight::{resolve_lines, HighlightRequest, Timer, TimerKey, TimerQueue};
use crate::interceptor::{guard, intercept, GuardReason};
use crate::mutations::{Assoc, Batch, Mark, MarkType, Origin, Selection, Step};
use crate::pipeline::Pipeline;
use crate::review::{self, ReviewAction, ReviewReport, ReviewScope};
use crate::session::TrackingSession;
use crate::undo_stack::{HistoryEntry, UndoStack};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// What happened to a submitted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CommitOutcome {
    /// Went through the interceptor
    Rewritten {
        tracked: bool,
        retained: usize,
        combined_replace: bool,
    },

    /// Passed through unchanged
    Guarded { reason: GuardReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub outcome: CommitOutcome,
    pub version: u64,
    pub selection: Selection,
}

pub struct Editor {
    pipeline: Pipeline,
    history: UndoStack,
    session: TrackingSession,
    gate: CompositionGate,
    selection: Selection,
    timers: TimerQueue,
    highlight: HighlightConfig,
    clock: Arc<dyn Clock>,
}

impl Editor {
    pub fn new(document: Document, config: &EditorConfig) -> Self {
        Self::with_clock(document, config, Arc::new(SystemClock))
    }

    pub fn with_clock(document: Document, config: &EditorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            pipeline: Pipeline::new(document),
            history: UndoStack::with_max_levels(config.history.max_levels),
            session: TrackingSession::new(config.tracking.author(), config.tracking.enabled),
            gate: CompositionGate::new(),
            selection: Selection::default(),
            timers: TimerQueue::new(),
            highlight: config.highlight.clone(),
            clock,
        }
    }

    /// Process one batch from the editing surface (or any other source).
    ///
    /// Either the whole batch commits or nothing changes.
    pub fn submit(&mut self, batch: Batch) -> Result<CommitReport, EditorError> {
        let phase = self.gate.phase();
        self.gate.reset();

        match guard(&batch) {
            Some(reason) => self.commit_guarded(batch, reason),
            None => self.commit_tracked(batch, phase),
        }
    }

    fn commit_guarded(&mut self, batch: Batch, reason: GuardReason) -> Result<CommitReport, EditorError> {
        if reason == GuardReason::Empty {
            debug!(origin = ?batch.origin, "Skipped empty batch");
            return Ok(self.report(CommitOutcome::Guarded { reason }));
        }

        let selection_before = self.selection;
        let result = self.pipeline.commit(&batch.steps)?;

        let surface = batch
            .selection
            .unwrap_or_else(|| selection_before.map_with(|pos| batch.map(pos, Assoc::After)));
        self.selection = surface.clamp(self.pipeline.document().size());
        self.timers.map_through(&batch.steps);

        match reason {
            GuardReason::ReviewCommit => self.history.record(HistoryEntry::new(
                batch.steps,
                result.inverses,
                selection_before,
                self.selection,
            )),
            // Recorded positions are meaningless once a peer edited the document
            GuardReason::RemoteSync => self.history.clear(),
            GuardReason::HistoryReplay | GuardReason::Empty => {}
        }

        debug!(reason = ?reason, version = result.version, "Committed guarded batch");
        Ok(self.report(CommitOutcome::Guarded { reason }))
    }

    fn commit_tracked(&mut self, batch: Batch, phase: CompositionPhase) -> Result<CommitReport, EditorError> {
        let attribution = self.session.attribution(self.clock.now());
        let interception = intercept(self.pipeline.document(), &batch.steps, attribution.as_ref())?;

        let selection_before = self.selection;
        let result = self.pipeline.commit(&interception.steps)?;

        let surface = batch
            .selection
            .unwrap_or_else(|| selection_before.map_with(|pos| batch.map(pos, Assoc::After)));
        self.selection = reconcile_selection(surface, &interception, phase, self.pipeline.document().size());
        self.timers.map_through(&interception.steps);

        let outcome = CommitOutcome::Rewritten {
            tracked: interception.tracked,
            retained: interception.retained(),
            combined_replace: interception.combined_replace,
        };
        self.history.record(HistoryEntry::new(
            interception.steps,
            result.inverses,
            selection_before,
            self.selection,
        ));

        debug!(
            version = result.version,
            phase = ?phase,
            anchor = self.selection.anchor,
            head = self.selection.head,
            "Committed local batch"
        );
        Ok(self.report(outcome))
    }

    fn report(&self, outcome: CommitOutcome) -> CommitReport {
        CommitReport {
            outcome,
            version: self.pipeline.version(),
            selection: self.selection,
        }
    }

    // -- Tracking status ----------------------------------------------------

    pub fn set_tracking_enabled(&mut self, enabled: bool) {
        self.session.set_enabled(enabled);
    }

    pub fn tracking_enabled(&self) -> bool {
        self.session.enabled()
    }

    /// Flip tracking; returns the new status
    pub fn toggle_tracking(&mut self) -> bool {
        self.session.toggle()
    }

    pub fn update_author(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.session.update_author(id, name);
    }

    /// Called now with the current status and again on every flip
    pub fn on_status_change(&mut self, listener: impl FnMut(bool) + Send + 'static) {
        self.session.on_status_change(listener);
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    // -- Review ---------------------------------------------------------------

    pub fn accept(&mut self, scope: ReviewScope) -> Result<ReviewReport, EditorError> {
        self.review(ReviewAction::Accept, scope)
    }

    pub fn reject(&mut self, scope: ReviewScope) -> Result<ReviewReport, EditorError> {
        self.review(ReviewAction::Reject, scope)
    }

    /// Accept the changes in `[from, to)`, as an accept button on one change would
    pub fn accept_range(&mut self, from: usize, to: usize) -> Result<ReviewReport, EditorError> {
        self.set_selection(Selection::range(from, to))?;
        self.review(ReviewAction::Accept, ReviewScope::Selection)
    }

    pub fn reject_range(&mut self, from: usize, to: usize) -> Result<ReviewReport, EditorError> {
        self.set_selection(Selection::range(from, to))?;
        self.review(ReviewAction::Reject, ReviewScope::Selection)
    }

    fn review(&mut self, action: ReviewAction, scope: ReviewScope) -> Result<ReviewReport, EditorError> {
        let plan = review::plan(self.pipeline.document(), self.selection, action, scope).map_err(|err| {
            if err.is_noop() {
                info!(action = %action, scope = ?scope, "Nothing to review");
            }
            err
        })?;
        let removed = plan.removed();
        let commit = self.submit(plan.batch)?;
        self.history.describe_last(describe_review(action, plan.targets.len()));

        info!(
            action = %action,
            from = plan.resolved.0,
            to = plan.resolved.1,
            changes = plan.targets.len(),
            removed,
            "Reviewed tracked changes"
        );

        Ok(ReviewReport {
            action,
            resolved: plan.resolved,
            acted: plan.targets,
            removed,
            version: commit.version,
        })
    }

    // -- History --------------------------------------------------------------

    /// Undo the last entry; `Ok(None)` when there is nothing to undo
    pub fn undo(&mut self) -> Result<Option<CommitReport>, EditorError> {
        let mut history = std::mem::take(&mut self.history);
        let result = history.undo(|batch| self.submit(batch));
        self.history = history;
        result
    }

    pub fn redo(&mut self) -> Result<Option<CommitReport>, EditorError> {
        let mut history = std::mem::take(&mut self.history);
        let result = history.redo(|batch| self.submit(batch));
        self.history = history;
        result
    }

    /// Record the following commits as a single undo step until [`Editor::end_group`]
    pub fn begin_group(&mut self) {
        self.history.begin_batch();
    }

    pub fn end_group(&mut self) {
        self.history.end_batch();
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    // -- Remote sync ----------------------------------------------------------

    /// Commit steps received from a peer without tracking them again
    pub fn apply_remote(&mut self, steps: Vec<Step>) -> Result<CommitReport, EditorError> {
        self.submit(Batch::new(steps).with_origin(Origin::RemoteSync))
    }

    // -- Composition ----------------------------------------------------------

    pub fn composition_start(&mut self) {
        self.gate.begin();
    }

    pub fn composition_update(&mut self) {
        self.gate.update();
    }

    pub fn composition_end(&mut self) {
        self.gate.end();
    }

    pub fn composition_phase(&self) -> CompositionPhase {
        self.gate.phase()
    }

    // -- Temporary highlight ----------------------------------------------------

    /// Highlight a span of lines and schedule its removal.
    ///
    /// Returns `Ok(None)` when the lines resolve to an empty range.
    pub fn highlight_lines(&mut self, request: HighlightRequest) -> Result<Option<CommitReport>, EditorError> {
        let (from, to) = resolve_lines(self.pipeline.document(), request.start_line, request.end_line);
        if from >= to {
            debug!(start_line = request.start_line, end_line = request.end_line, "Nothing to highlight");
            return Ok(None);
        }

        let color = request.color.unwrap_or_else(|| self.highlight.default_color.clone());
        let batch = Batch::new(vec![Step::AddMark {
            from,
            to,
            mark: Mark::Highlight(Highlight { color }),
        }])
        .with_selection(Selection::range(from, to));
        let report = self.submit(batch)?;

        let due = self.clock.now() + self.highlight.duration();
        let superseded = self.timers.schedule(Timer {
            key: TimerKey::ClearHighlight,
            due,
            from,
            to,
        });
        debug!(from, to, superseded = superseded.is_some(), "Scheduled highlight clear");

        Ok(Some(report))
    }

    /// Fire every timer that is due
    pub fn tick(&mut self) -> Result<Vec<CommitReport>, EditorError> {
        let due = self.timers.take_due(self.clock.now());
        let mut reports = Vec::with_capacity(due.len());
        for timer in due {
            match timer.key {
                TimerKey::ClearHighlight => {
                    let to = timer.to.min(self.pipeline.document().size());
                    let from = timer.from.min(to);
                    let batch = Batch::new(vec![Step::RemoveMark {
                        from,
                        to,
                        mark_type: MarkType::Highlight,
                    }])
                    .with_selection(Selection::caret(to));
                    reports.push(self.submit(batch)?);
                }
            }
        }
        Ok(reports)
    }

    pub fn pending_timers(&self) -> &[Timer] {
        self.timers.pending()
    }

    // -- Views ----------------------------------------------------------------

    pub fn document(&self) -> &Document {
        self.pipeline.document()
    }

    pub fn text(&self) -> String {
        self.pipeline.document().text()
    }

    /// Tracked changes as of the last commit
    pub fn annotations(&self) -> &[AnnotationSpan] {
        self.pipeline.annotations()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditorError> {
        let size = self.pipeline.document().size();
        if selection.end() > size {
            return Err(EditorError::InvalidRange {
                from: selection.start(),
                to: selection.end(),
                size,
            });
        }
        self.selection = selection;
        Ok(())
    }

    pub fn version(&self) -> u64 {
        self.pipeline.version()
    }
}

fn describe_review(action: ReviewAction, changes: usize) -> String {
    let noun = if changes == 1 { "change" } else { "changes" };
    format!("{} {} {}", action, changes, noun)
}
