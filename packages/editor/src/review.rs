//! # Accept/Reject Protocol
//!
//! Finalizes or undoes tracked annotations over a target range.
//!
//! | action | Insertion              | Deletion               |
//! |--------|------------------------|------------------------|
//! | accept | strip mark, keep text  | remove text            |
//! | reject | remove text            | strip mark, keep text  |
//!
//! The target is the selection when it is a range, the whole annotated run
//! touching the caret when it is a point, or the whole document. Runs are
//! processed in position order; removals shift every later run, so the
//! cumulative removed length is subtracted from their coordinates.
//!
//! The planned batch is tagged [`Origin::Review`] so the interceptor lets it
//! through untouched.

use crate::annotation::{AnnotationKind, AnnotationSpan};
use crate::document::Document;
use crate::errors::EditorError;
use crate::mutations::{Batch, MarkType, Origin, Selection, Step};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Accept,
    Reject,
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewAction::Accept => write!(f, "accept"),
            ReviewAction::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewScope {
    /// Current selection, or the annotated run at the caret
    Selection,

    /// Every annotation in the document
    Document,
}

/// Planned review commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPlan {
    pub action: ReviewAction,

    /// Range the scope resolved to
    pub resolved: (usize, usize),

    /// Annotated runs acted on, clipped to the resolved range
    pub targets: Vec<AnnotationSpan>,

    pub batch: Batch,
}

impl ReviewPlan {
    /// Content length the plan removes from the document
    pub fn removed(&self) -> usize {
        self.targets
            .iter()
            .filter(|span| removes(self.action, span.kind))
            .map(AnnotationSpan::len)
            .sum()
    }
}

/// Outcome of a committed review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub action: ReviewAction,
    pub resolved: (usize, usize),

    /// Annotated runs acted on (coordinates before the commit)
    pub acted: Vec<AnnotationSpan>,

    /// Content length removed from the document
    pub removed: usize,

    pub version: u64,
}

/// Whether `action` removes content annotated with `kind`
pub fn removes(action: ReviewAction, kind: AnnotationKind) -> bool {
    matches!(
        (action, kind),
        (ReviewAction::Accept, AnnotationKind::Deletion) | (ReviewAction::Reject, AnnotationKind::Insertion)
    )
}

/// Range a review command applies to, or `None` when a caret touches no annotation
pub fn resolve_scope(
    doc: &Document,
    selection: Selection,
    scope: ReviewScope,
) -> Result<Option<(usize, usize)>, EditorError> {
    match scope {
        ReviewScope::Document => Ok(Some((0, doc.size()))),
        ReviewScope::Selection => {
            let (from, to) = (selection.start(), selection.end());
            if to > doc.size() {
                return Err(EditorError::InvalidRange {
                    from,
                    to,
                    size: doc.size(),
                });
            }
            if selection.is_caret() {
                Ok(doc.annotation_at(from).map(|span| (span.from, span.to)))
            } else {
                Ok(Some((from, to)))
            }
        }
    }
}

/// Build the review batch for `action` over `scope`.
///
/// Fails with [`EditorError::NoOp`] when nothing annotated is in range.
pub fn plan(
    doc: &Document,
    selection: Selection,
    action: ReviewAction,
    scope: ReviewScope,
) -> Result<ReviewPlan, EditorError> {
    let (from, to) = resolve_scope(doc, selection, scope)?.ok_or(EditorError::NoOp { action })?;
    let targets = doc.annotations_between(from, to);
    if targets.is_empty() {
        return Err(EditorError::NoOp { action });
    }

    let mut offset = 0;
    let mut steps = Vec::with_capacity(targets.len());
    for span in &targets {
        let (start, end) = (span.from - offset, span.to - offset);
        if removes(action, span.kind) {
            steps.push(Step::delete(start, end));
            offset += span.len();
        } else {
            steps.push(Step::RemoveMark {
                from: start,
                to: end,
                mark_type: MarkType::from(span.kind),
            });
        }
    }

    Ok(ReviewPlan {
        action,
        resolved: (from, to),
        targets,
        batch: Batch::new(steps).with_origin(Origin::Review),
    })
}
