//! Integration tests for the editor crate

use chrono::{Duration, TimeZone, Utc};
use redline_editor::{
    AnnotationKind, Batch, CommitOutcome, Document, Editor, EditorConfig, EditorError, GuardReason,
    HighlightRequest, ManualClock, ReviewAction, ReviewScope, Selection, Step,
};
use std::sync::{Arc, Mutex};

fn editor(text: &str, tracking: bool) -> (Editor, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 2, 14, 30, 0).unwrap());
    let mut config = EditorConfig::default();
    config.tracking.enabled = tracking;
    config.tracking.author_id = "a".to_string();
    config.tracking.author_name = "Author A".to_string();
    let editor = Editor::with_clock(Document::from_text(text), &config, Arc::new(clock.clone()));
    (editor, clock)
}

fn inserted_there() -> Editor {
    let (mut editor, _) = editor("Hello world", true);
    editor.submit(Batch::insert(5, " there")).unwrap();
    editor
}

fn deleted_world() -> Editor {
    let (mut editor, _) = editor("Hello world", true);
    editor.submit(Batch::delete(6, 11)).unwrap();
    editor
}

fn replaced_b() -> Editor {
    let (mut editor, _) = editor("abc", true);
    editor.submit(Batch::replace(1, 2, "x")).unwrap();
    editor
}

#[test]
fn test_tracked_insertion() {
    let editor = inserted_there();

    assert_eq!(editor.text(), "Hello there world");
    let annotations = editor.annotations();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].kind, AnnotationKind::Insertion);
    assert_eq!((annotations[0].from, annotations[0].to), (5, 11));
    assert_eq!(annotations[0].author_id, "a");
    assert_eq!(annotations[0].author_name, "Author A");
}

#[test]
fn test_tracked_insertion_accept_and_reject() {
    let mut accepted = inserted_there();
    accepted.accept(ReviewScope::Document).unwrap();
    assert_eq!(accepted.text(), "Hello there world");
    assert!(accepted.annotations().is_empty());

    let mut rejected = inserted_there();
    rejected.reject(ReviewScope::Document).unwrap();
    assert_eq!(rejected.text(), "Hello world");
    assert!(rejected.annotations().is_empty());
}

#[test]
fn test_tracked_deletion() {
    let editor = deleted_world();

    assert_eq!(editor.text(), "Hello world");
    assert_eq!(editor.document().size(), 11);
    let annotations = editor.annotations();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].kind, AnnotationKind::Deletion);
    assert_eq!((annotations[0].from, annotations[0].to), (6, 11));
    assert_eq!(editor.selection(), Selection::caret(6));
}

#[test]
fn test_tracked_deletion_accept_and_reject() {
    let mut accepted = deleted_world();
    let report = accepted.accept(ReviewScope::Document).unwrap();
    assert_eq!(accepted.text(), "Hello ");
    assert_eq!(report.removed, 5);

    let mut rejected = deleted_world();
    let report = rejected.reject(ReviewScope::Document).unwrap();
    assert_eq!(rejected.text(), "Hello world");
    assert_eq!(report.removed, 0);
    assert!(rejected.annotations().is_empty());
}

#[test]
fn test_combined_replace() {
    let editor = replaced_b();

    assert_eq!(editor.text(), "axbc");
    let kinds: Vec<_> = editor
        .annotations()
        .iter()
        .map(|span| (span.kind, span.from, span.to))
        .collect();
    assert_eq!(
        kinds,
        vec![(AnnotationKind::Insertion, 1, 2), (AnnotationKind::Deletion, 2, 3)]
    );
    assert_eq!(editor.selection(), Selection::caret(3));

    let mut accepted = replaced_b();
    accepted.accept(ReviewScope::Document).unwrap();
    assert_eq!(accepted.text(), "axc");

    let mut rejected = replaced_b();
    rejected.reject(ReviewScope::Document).unwrap();
    assert_eq!(rejected.text(), "abc");
}

#[test]
fn test_untracked_edit_has_nothing_to_review() {
    let (mut editor, _) = editor("Hello world", false);
    let report = editor.submit(Batch::insert(5, " there")).unwrap();

    assert_eq!(
        report.outcome,
        CommitOutcome::Rewritten {
            tracked: false,
            retained: 0,
            combined_replace: false
        }
    );
    assert_eq!(editor.text(), "Hello there world");
    assert!(editor.annotations().is_empty());

    let err = editor.accept(ReviewScope::Document).unwrap_err();
    assert!(matches!(err, EditorError::NoOp { action: ReviewAction::Accept }));
    let err = editor.reject(ReviewScope::Document).unwrap_err();
    assert!(matches!(err, EditorError::NoOp { action: ReviewAction::Reject }));
}

#[test]
fn test_accept_without_changes_is_idempotent() {
    let (mut editor, _) = editor("Hello world", true);
    let before = editor.document().clone();

    assert!(editor.accept(ReviewScope::Document).unwrap_err().is_noop());
    assert_eq!(editor.document(), &before);
    assert_eq!(editor.version(), 0);
}

#[test]
fn test_repeated_partial_accept() {
    let mut editor = deleted_world();

    editor.accept_range(6, 8).unwrap();
    assert_eq!(editor.text(), "Hello rld");
    editor.accept_range(6, 9).unwrap();
    assert_eq!(editor.text(), "Hello ");

    // Nothing left to act on
    assert!(editor.accept(ReviewScope::Document).unwrap_err().is_noop());
    assert_eq!(editor.text(), "Hello ");
}

#[test]
fn test_caret_review_acts_on_touching_change_only() {
    let mut editor = replaced_b();
    editor.set_selection(Selection::caret(2)).unwrap();

    let report = editor.accept(ReviewScope::Selection).unwrap();
    assert_eq!(report.resolved, (1, 2));
    assert_eq!(report.acted.len(), 1);
    assert_eq!(editor.text(), "axbc");
    assert_eq!(editor.annotations().len(), 1);
    assert_eq!(editor.annotations()[0].kind, AnnotationKind::Deletion);
}

#[test]
fn test_review_commits_are_guarded() {
    let mut editor = replaced_b();
    let version = editor.version();

    editor.reject(ReviewScope::Document).unwrap();
    assert_eq!(editor.version(), version + 1);
    // A tracked commit would have retained the rejected insertion
    assert!(editor.annotations().is_empty());
}

#[test]
fn test_undo_restores_rejected_changes() {
    let mut editor = replaced_b();
    editor.reject(ReviewScope::Document).unwrap();
    assert_eq!(editor.text(), "abc");

    let report = editor.undo().unwrap().unwrap();
    assert_eq!(
        report.outcome,
        CommitOutcome::Guarded {
            reason: GuardReason::HistoryReplay
        }
    );
    assert_eq!(editor.text(), "axbc");
    assert_eq!(editor.annotations().len(), 2);

    editor.redo().unwrap().unwrap();
    assert_eq!(editor.text(), "abc");
}

#[test]
fn test_review_entries_are_described() {
    let mut editor = replaced_b();
    assert_eq!(editor.history().undo_description(), None);

    editor.accept_range(1, 2).unwrap();
    assert_eq!(editor.history().undo_description(), Some("accept 1 change"));
    editor.reject(ReviewScope::Document).unwrap();
    assert_eq!(editor.history().undo_description(), Some("reject 1 change"));

    editor.undo().unwrap().unwrap();
    assert_eq!(editor.history().redo_description(), Some("reject 1 change"));
    assert_eq!(editor.history().undo_description(), Some("accept 1 change"));
}

#[test]
fn test_grouped_commits_undo_together() {
    let (mut editor, _) = editor("abc", true);
    editor.begin_group();
    editor.submit(Batch::insert(3, "d")).unwrap();
    editor.submit(Batch::insert(4, "e")).unwrap();
    editor.end_group();

    assert_eq!(editor.text(), "abcde");
    editor.undo().unwrap().unwrap();
    assert_eq!(editor.text(), "abc");
    assert!(editor.annotations().is_empty());
}

#[test]
fn test_remote_batches_are_not_annotated() {
    let (mut editor, _) = editor("abc", true);
    let report = editor.apply_remote(vec![Step::delete(0, 1)]).unwrap();

    assert_eq!(
        report.outcome,
        CommitOutcome::Guarded {
            reason: GuardReason::RemoteSync
        }
    );
    assert_eq!(editor.text(), "bc");
    assert!(editor.annotations().is_empty());
}

#[test]
fn test_composition_suppresses_caret_correction() {
    let (mut editor, _) = editor("abc", true);

    editor.composition_start();
    let report = editor.submit(Batch::replace(1, 2, "x")).unwrap();
    assert_eq!(editor.text(), "axbc");
    assert_eq!(report.selection, Selection::caret(2));

    // The engine re-issues the preview over its own insertion
    editor.composition_update();
    let report = editor.submit(Batch::replace(1, 2, "xy")).unwrap();
    editor.composition_end();

    assert_eq!(editor.text(), "axybc");
    assert_eq!(report.selection, Selection::caret(3));
    let kinds: Vec<_> = editor
        .annotations()
        .iter()
        .map(|span| (span.kind, span.from, span.to))
        .collect();
    assert_eq!(
        kinds,
        vec![(AnnotationKind::Insertion, 1, 3), (AnnotationKind::Deletion, 3, 4)]
    );
}

#[test]
fn test_status_listener() {
    let (mut editor, _) = editor("abc", false);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    editor.on_status_change(move |enabled| sink.lock().unwrap().push(enabled));

    editor.set_tracking_enabled(true);
    editor.set_tracking_enabled(true);
    assert!(!editor.toggle_tracking());

    assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
}

#[test]
fn test_author_change_splits_annotations() {
    let (mut editor, _) = editor("", true);
    editor.submit(Batch::insert(0, "ab")).unwrap();
    editor.update_author("b", "Author B");
    editor.submit(Batch::insert(2, "cd")).unwrap();

    let authors: Vec<_> = editor.annotations().iter().map(|span| span.author_id.clone()).collect();
    assert_eq!(authors, vec!["a", "b"]);
}

#[test]
fn test_newer_highlight_supersedes_older() {
    let (mut editor, clock) = editor("one\ntwo\nthree", true);
    editor.highlight_lines(HighlightRequest::lines(1, 1)).unwrap().unwrap();
    clock.advance(Duration::seconds(3));
    editor.highlight_lines(HighlightRequest::lines(3, 3)).unwrap().unwrap();
    assert_eq!(editor.pending_timers().len(), 1);

    // Highlights are formatting, not tracked edits
    assert!(editor.annotations().is_empty());

    clock.advance(Duration::seconds(5));
    let fired = editor.tick().unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(editor.selection(), Selection::caret(13));
    let units = editor.document().units();
    assert!(units[8].marks.highlight.is_none());
    // The superseded clear never ran
    assert!(units[0].marks.highlight.is_some());
}

#[test]
fn test_highlight_follows_later_edits() {
    let (mut editor, clock) = editor("one\ntwo", false);
    editor.highlight_lines(HighlightRequest::lines(2, 2)).unwrap().unwrap();
    editor.submit(Batch::insert(0, ">> ")).unwrap();

    assert_eq!((editor.pending_timers()[0].from, editor.pending_timers()[0].to), (7, 10));
    clock.advance(Duration::milliseconds(5000));
    editor.tick().unwrap();
    assert!(editor.document().units()[7..10].iter().all(|unit| unit.marks.highlight.is_none()));
}

#[test]
fn test_highlight_outside_document_does_nothing() {
    let (mut editor, _) = editor("one", false);
    assert!(editor.highlight_lines(HighlightRequest::lines(4, 5)).unwrap().is_none());
    assert!(editor.pending_timers().is_empty());
    assert_eq!(editor.version(), 0);
}
