//! # Operation Interceptor
//!
//! Rewrites a batch of edit steps so that nothing the user removes is lost
//! while tracking is on.
//!
//! ## Rewrite Rules
//!
//! For every replace step of the submitted batch:
//!
//! 1. The replacement content lands where the user put it, annotated as an
//!    Insertion (tracking on) or stripped of any tracking marks it carried
//!    over from neighbouring text (tracking off).
//! 2. With tracking on, the removed content is put back right after the new
//!    content and annotated as a Deletion. Sub-runs that were themselves
//!    provisional insertions are dropped for real: nothing was ever
//!    finalized there, so there is nothing to preserve.
//! 3. Every retained run is recorded in an [`OffsetMap`] so the coordinates of
//!    later steps in the batch, written against a document without the
//!    retained runs, are shifted past them.
//!
//! Other steps (formatting marks) pass through with mapped coordinates.
//!
//! ```text
//! "abc", select "b", type "x"
//!
//!   submitted:  Replace 1..2 "x"                    → "axc"
//!   rewritten:  Replace 1..2 "x"[ins]               → "axc"
//!               Insert  2    "b"[del]               → "axbc"
//! ```
//!
//! [`intercept`] is pure: it reads the document as it was before the batch
//! and returns the steps to commit instead of the submitted ones. Batches that
//! [`guard`] flags are committed as submitted.

use crate::annotation::{Annotation, Attribution};
use crate::document::Document;
use crate::mutations::{Assoc, Batch, Origin, Step, StepError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why a batch skipped interception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuardReason {
    /// No steps
    Empty,

    /// Undo/redo replay
    HistoryReplay,

    /// Already tracked (or deliberately untracked) by a peer
    RemoteSync,

    /// Accept/reject commit
    ReviewCommit,
}

/// Whether `batch` must pass through unchanged, and why
pub fn guard(batch: &Batch) -> Option<GuardReason> {
    if batch.is_empty() {
        return Some(GuardReason::Empty);
    }
    match batch.origin {
        Origin::Local => None,
        Origin::History => Some(GuardReason::HistoryReplay),
        Origin::RemoteSync => Some(GuardReason::RemoteSync),
        Origin::Review => Some(GuardReason::ReviewCommit),
    }
}

/// Retained runs inserted by the rewrite, keyed by where they sit in the
/// coordinates of the batch as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMap {
    retained: Vec<(usize, usize)>,
}

impl OffsetMap {
    /// Map a submitted coordinate into the rewritten document.
    ///
    /// `Assoc::After` places a position that coincides with a retained run
    /// after it, `Assoc::Before` in front of it.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        let shift: usize = self
            .retained
            .iter()
            .filter(|(at, _)| *at < pos || (*at == pos && assoc == Assoc::After))
            .map(|(_, len)| len)
            .sum();
        pos + shift
    }

    /// Total length of content retained instead of deleted
    pub fn total(&self) -> usize {
        self.retained.iter().map(|(_, len)| len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }

    fn map_range(&self, from: usize, to: usize) -> (usize, usize) {
        if from == to {
            let at = self.map(from, Assoc::After);
            (at, at)
        } else {
            (self.map(from, Assoc::After), self.map(to, Assoc::Before))
        }
    }

    /// Follow a submitted step that replaced `[from, to)` with `inserted` units
    fn rebase(&mut self, from: usize, to: usize, inserted: usize) {
        if from == to {
            for (at, _) in &mut self.retained {
                if *at > from {
                    *at += inserted;
                }
            }
            return;
        }

        // Runs inside the replaced range are removed and retained again by it
        self.retained.retain(|(at, _)| *at <= from || *at >= to);
        for (at, _) in &mut self.retained {
            if *at >= to {
                *at = *at - (to - from) + inserted;
            }
        }
    }

    fn record(&mut self, at: usize, len: usize) {
        self.retained.push((at, len));
    }
}

/// Result of rewriting one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interception {
    /// Steps to commit in place of the submitted ones
    pub steps: Vec<Step>,

    pub offsets: OffsetMap,

    /// Whether tracking annotations were applied
    pub tracked: bool,

    /// Some step both removed finalized content and inserted new content
    pub combined_replace: bool,
}

impl Interception {
    /// Length of content retained instead of deleted
    pub fn retained(&self) -> usize {
        self.offsets.total()
    }
}

/// Rewrite `steps` (addressed against `doc` and its successors).
///
/// `attribution` is `Some` while tracking is enabled.
pub fn intercept(
    doc: &Document,
    steps: &[Step],
    attribution: Option<&Attribution>,
) -> Result<Interception, StepError> {
    let insertion = attribution.map(|a| Annotation::insertion(a.clone()));
    let deletion = attribution.map(|a| Annotation::deletion(a.clone()));

    let mut working = doc.clone();
    let mut submitted_size = doc.size();
    let mut offsets = OffsetMap::default();
    let mut rewritten = Vec::with_capacity(steps.len() * 2);
    let mut combined_replace = false;

    for step in steps {
        let (from, to) = step.range();
        if from > to {
            return Err(StepError::InvertedRange { from, to });
        }
        if to > submitted_size {
            return Err(StepError::OutOfBounds {
                from,
                to,
                size: submitted_size,
            });
        }

        let (mapped_from, mapped_to) = offsets.map_range(from, to);
        let Step::Replace { content, .. } = step else {
            let mapped = step.with_range(mapped_from, mapped_to);
            mapped.apply(&mut working)?;
            rewritten.push(mapped);
            continue;
        };

        let kept = working.slice(mapped_from, mapped_to)?.without_insertions();
        let inserted = content.len();
        if inserted > 0 && !kept.is_empty() {
            combined_replace = true;
        }

        let replace = Step::Replace {
            from: mapped_from,
            to: mapped_to,
            content: content.clone().with_tracking(insertion.as_ref()),
        };
        replace.apply(&mut working)?;
        rewritten.push(replace);

        offsets.rebase(from, to, inserted);
        submitted_size = submitted_size - (to - from) + inserted;

        if let Some(deletion) = &deletion {
            if !kept.is_empty() {
                let retained = kept.len();
                let reinsert = Step::insert(mapped_from + inserted, kept.with_tracking(Some(deletion)));
                reinsert.apply(&mut working)?;
                rewritten.push(reinsert);
                offsets.record(from + inserted, retained);
            }
        }
    }

    debug!(
        submitted = steps.len(),
        rewritten = rewritten.len(),
        retained = offsets.total(),
        combined_replace,
        tracked = attribution.is_some(),
        "Intercepted batch"
    );

    Ok(Interception {
        steps: rewritten,
        offsets,
        tracked: attribution.is_some(),
        combined_replace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationKind, Author};
    use crate::document::Fragment;
    use chrono::{TimeZone, Utc};

    fn attribution(id: &str) -> Attribution {
        Author::new(id, id.to_uppercase()).attribution(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn commit(doc: &Document, steps: &[Step], attribution: Option<&Attribution>) -> (Document, Interception) {
        let interception = intercept(doc, steps, attribution).unwrap();
        let mut next = doc.clone();
        next.apply_batch(&interception.steps).unwrap();
        (next, interception)
    }

    #[test]
    fn test_insertion_is_annotated() {
        let doc = Document::from_text("Hello world");
        let a = attribution("a");
        let (next, interception) = commit(&doc, &[Step::insert(5, Fragment::text(" there"))], Some(&a));

        assert_eq!(next.text(), "Hello there world");
        let spans = next.annotations();
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].kind, spans[0].from, spans[0].to), (AnnotationKind::Insertion, 5, 11));
        assert_eq!(interception.retained(), 0);
        assert!(!interception.combined_replace);
    }

    #[test]
    fn test_deletion_is_retained() {
        let doc = Document::from_text("Hello world");
        let a = attribution("a");
        let (next, interception) = commit(&doc, &[Step::delete(6, 11)], Some(&a));

        assert_eq!(next.text(), "Hello world");
        let spans = next.annotations();
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].kind, spans[0].from, spans[0].to), (AnnotationKind::Deletion, 6, 11));
        assert_eq!(interception.retained(), 5);
        assert!(!interception.combined_replace);
    }

    #[test]
    fn test_combined_replace_orders_insertion_first() {
        let doc = Document::from_text("abc");
        let a = attribution("a");
        let step = Step::Replace {
            from: 1,
            to: 2,
            content: Fragment::text("x"),
        };
        let (next, interception) = commit(&doc, &[step], Some(&a));

        assert_eq!(next.text(), "axbc");
        assert!(next.units()[1].is_insertion());
        assert!(next.units()[2].is_deletion());
        assert!(interception.combined_replace);
        assert_eq!(interception.retained(), 1);
    }

    #[test]
    fn test_deleting_own_insertion_removes_it() {
        let a = attribution("a");
        let (doc, _) = commit(&Document::from_text("ab"), &[Step::insert(1, Fragment::text("XYZ"))], Some(&a));
        assert_eq!(doc.text(), "aXYZb");

        // Delete "aXYZb" entirely: only "a" and "b" were ever finalized
        let (next, interception) = commit(&doc, &[Step::delete(0, 5)], Some(&a));

        assert_eq!(next.text(), "ab");
        assert_eq!(next.annotated_len(AnnotationKind::Deletion), 2);
        assert_eq!(next.annotated_len(AnnotationKind::Insertion), 0);
        assert_eq!(interception.retained(), 2);
    }

    #[test]
    fn test_deleting_another_authors_insertion_removes_it() {
        let a = attribution("a");
        let b = attribution("b");
        let (doc, _) = commit(&Document::from_text("abcd"), &[Step::insert(2, Fragment::text("XYZ"))], Some(&a));
        assert_eq!(doc.text(), "abXYZcd");

        // B strikes "bXYZc": A's pending "XYZ" goes, "b" and "c" are kept
        let (next, interception) = commit(&doc, &[Step::delete(1, 6)], Some(&b));

        assert_eq!(next.text(), "abcd");
        assert_eq!(interception.retained(), 2);
        let spans = next.annotations();
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].kind, spans[0].from, spans[0].to), (AnnotationKind::Deletion, 1, 3));
        assert_eq!(spans[0].author_id, "b");
        assert_eq!(next.accepted_text(), "ad");
        assert_eq!(next.original_text(), "abcd");
    }

    #[test]
    fn test_disabled_tracking_strips_carried_marks() {
        let a = attribution("a");
        let carried = Fragment::text("zz").with_tracking(Some(&Annotation::insertion(a.clone())));
        let (next, interception) = commit(&Document::from_text("ab"), &[Step::insert(1, carried)], None);

        assert_eq!(next.text(), "azzb");
        assert!(next.annotations().is_empty());
        assert!(!interception.tracked);
    }

    #[test]
    fn test_disabled_tracking_deletes_normally() {
        let (next, interception) = commit(&Document::from_text("Hello world"), &[Step::delete(5, 11)], None);

        assert_eq!(next.text(), "Hello");
        assert!(interception.offsets.is_empty());
    }

    #[test]
    fn test_later_steps_are_shifted_past_retained_runs() {
        let a = attribution("a");
        // "abcdef": delete "bc", then (in the post-delete coordinates "adef")
        // insert "X" before "e" and delete "f"
        let steps = vec![
            Step::delete(1, 3),
            Step::insert(2, Fragment::text("X")),
            Step::delete(4, 5),
        ];
        let (next, interception) = commit(&Document::from_text("abcdef"), &steps, Some(&a));

        assert_eq!(next.text(), "abcdXef");
        assert_eq!(next.original_text(), "abcdef");
        assert_eq!(next.accepted_text(), "adXe");
        assert_eq!(interception.retained(), 3);
    }

    #[test]
    fn test_steps_before_retained_run_are_not_shifted() {
        let a = attribution("a");
        let steps = vec![Step::delete(3, 4), Step::insert(0, Fragment::text(">"))];
        let (next, _) = commit(&Document::from_text("abcd"), &steps, Some(&a));

        assert_eq!(next.text(), ">abcd");
        assert!(next.units()[0].is_insertion());
        assert!(next.units()[4].is_deletion());
    }

    #[test]
    fn test_redeleting_retained_run_keeps_it() {
        let a = attribution("a");
        // Delete "c", then the surface deletes "bd" around it (it no longer sees "c")
        let steps = vec![Step::delete(2, 3), Step::delete(1, 3)];
        let (next, interception) = commit(&Document::from_text("abcde"), &steps, Some(&a));

        assert_eq!(next.text(), "abcde");
        assert_eq!(next.accepted_text(), "ae");
        assert_eq!(next.annotated_len(AnnotationKind::Deletion), 3);
        assert_eq!(interception.retained(), 3);
    }

    #[test]
    fn test_out_of_bounds_step_is_rejected() {
        let result = intercept(&Document::from_text("abc"), &[Step::delete(2, 9)], None);
        assert_eq!(result, Err(StepError::OutOfBounds { from: 2, to: 9, size: 3 }));
    }

    #[test]
    fn test_guard_reasons() {
        assert_eq!(guard(&Batch::default()), Some(GuardReason::Empty));
        assert_eq!(guard(&Batch::insert(0, "a")), None);
        assert_eq!(
            guard(&Batch::insert(0, "a").with_origin(Origin::History)),
            Some(GuardReason::HistoryReplay)
        );
        assert_eq!(
            guard(&Batch::delete(0, 1).with_origin(Origin::RemoteSync)),
            Some(GuardReason::RemoteSync)
        );
        assert_eq!(
            guard(&Batch::delete(0, 1).with_origin(Origin::Review)),
            Some(GuardReason::ReviewCommit)
        );
    }

    #[test]
    fn test_offset_map_affinity() {
        let mut offsets = OffsetMap::default();
        offsets.record(4, 3);

        assert_eq!(offsets.map(3, Assoc::After), 3);
        assert_eq!(offsets.map(4, Assoc::Before), 4);
        assert_eq!(offsets.map(4, Assoc::After), 7);
        assert_eq!(offsets.map(9, Assoc::Before), 12);
    }
}
