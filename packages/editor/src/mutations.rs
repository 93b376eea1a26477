//! # Edit Steps and Batches
//!
//! Atomic operations the editing surface submits against the document.
//!
//! ## Step Semantics
//!
//! ### Replace
//! - Replaces `[from, to)` with a fragment
//! - `from == to` is a pure insertion, an empty fragment a pure deletion
//!
//! ### AddMark / RemoveMark
//! - Set or clear one mark type over a range without touching content
//! - Adding a tracking annotation overwrites the other tracking kind
//!
//! A batch is an ordered list of steps, each addressed against the document
//! produced by the previous one, plus the metadata the interceptor's guard
//! reads to decide whether the batch is a trackable edit.

use crate::annotation::{Annotation, AnnotationKind};
use crate::document::{Document, Fragment, Highlight};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mark payload for [`Step::AddMark`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mark {
    Tracking(Annotation),
    Highlight(Highlight),
}

/// Mark selector for [`Step::RemoveMark`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkType {
    Insertion,
    Deletion,
    Highlight,
}

impl From<AnnotationKind> for MarkType {
    fn from(kind: AnnotationKind) -> Self {
        match kind {
            AnnotationKind::Insertion => MarkType::Insertion,
            AnnotationKind::Deletion => MarkType::Deletion,
        }
    }
}

/// Atomic document operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    Replace {
        from: usize,
        to: usize,
        content: Fragment,
    },

    AddMark {
        from: usize,
        to: usize,
        mark: Mark,
    },

    RemoveMark {
        from: usize,
        to: usize,
        mark_type: MarkType,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Range {from}..{to} is outside the document (size {size})")]
    OutOfBounds { from: usize, to: usize, size: usize },

    #[error("Range start {from} is after its end {to}")]
    InvertedRange { from: usize, to: usize },
}

/// Which side a position sticks to when content is inserted exactly at it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

impl Step {
    pub fn insert(at: usize, content: Fragment) -> Self {
        Step::Replace {
            from: at,
            to: at,
            content,
        }
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Step::Replace {
            from,
            to,
            content: Fragment::empty(),
        }
    }

    pub fn range(&self) -> (usize, usize) {
        match self {
            Step::Replace { from, to, .. }
            | Step::AddMark { from, to, .. }
            | Step::RemoveMark { from, to, .. } => (*from, *to),
        }
    }

    /// Same step with its range moved to `[from, to)`
    pub fn with_range(&self, from: usize, to: usize) -> Self {
        match self {
            Step::Replace { content, .. } => Step::Replace {
                from,
                to,
                content: content.clone(),
            },
            Step::AddMark { mark, .. } => Step::AddMark {
                from,
                to,
                mark: mark.clone(),
            },
            Step::RemoveMark { mark_type, .. } => Step::RemoveMark {
                from,
                to,
                mark_type: *mark_type,
            },
        }
    }

    /// Apply to the document and return the inverse step
    pub fn apply(&self, doc: &mut Document) -> Result<Step, StepError> {
        match self {
            Step::Replace { from, to, content } => {
                let removed = doc.splice(*from, *to, content.clone())?;
                Ok(Step::Replace {
                    from: *from,
                    to: *from + content.len(),
                    content: removed,
                })
            }

            Step::AddMark { from, to, mark } => {
                let before = doc.slice(*from, *to)?;
                for unit in doc.units_mut(*from, *to)? {
                    match mark {
                        Mark::Tracking(annotation) => unit.marks.tracking = Some(annotation.clone()),
                        Mark::Highlight(highlight) => unit.marks.highlight = Some(highlight.clone()),
                    }
                }
                Ok(Step::Replace {
                    from: *from,
                    to: *to,
                    content: before,
                })
            }

            Step::RemoveMark {
                from,
                to,
                mark_type,
            } => {
                let before = doc.slice(*from, *to)?;
                for unit in doc.units_mut(*from, *to)? {
                    match mark_type {
                        MarkType::Highlight => unit.marks.highlight = None,
                        MarkType::Insertion if unit.is_insertion() => unit.marks.tracking = None,
                        MarkType::Deletion if unit.is_deletion() => unit.marks.tracking = None,
                        _ => {}
                    }
                }
                Ok(Step::Replace {
                    from: *from,
                    to: *to,
                    content: before,
                })
            }
        }
    }

    /// Map a position from the document before this step to the one after it
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        let Step::Replace { from, to, content } = self else {
            return pos;
        };
        let (from, to, inserted) = (*from, *to, content.len());
        if from == to {
            if pos < from || (pos == from && assoc == Assoc::Before) {
                pos
            } else {
                pos + inserted
            }
        } else if pos <= from {
            pos
        } else if pos >= to {
            pos - (to - from) + inserted
        } else {
            // Inside the replaced range
            match assoc {
                Assoc::Before => from,
                Assoc::After => from + inserted,
            }
        }
    }
}

/// Caret or range selection (`anchor == head` is a caret)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn caret(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_caret(&self) -> bool {
        self.anchor == self.head
    }

    pub fn map_with(&self, f: impl Fn(usize) -> usize) -> Self {
        Self {
            anchor: f(self.anchor),
            head: f(self.head),
        }
    }

    pub fn clamp(&self, size: usize) -> Self {
        self.map_with(|p| p.min(size))
    }
}

/// Where a batch came from; everything except `Local` bypasses tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// Typed, pasted, cut... by the local user
    #[default]
    Local,

    /// Undo/redo replay
    History,

    /// Received from a remote synchronization channel
    RemoteSync,

    /// Produced by accept/reject
    Review,
}

/// Steps applied together as one logical user action
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Batch {
    pub steps: Vec<Step>,

    /// Selection the editing surface computed assuming ordinary semantics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,

    #[serde(default)]
    pub origin: Origin,
}

impl Batch {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            selection: None,
            origin: Origin::Local,
        }
    }

    /// Type `text` at `at`; the caret ends after it
    pub fn insert(at: usize, text: &str) -> Self {
        let content = Fragment::text(text);
        let caret = at + content.len();
        Self::new(vec![Step::insert(at, content)]).with_selection(Selection::caret(caret))
    }

    /// Delete `[from, to)`; the caret ends at `from`
    pub fn delete(from: usize, to: usize) -> Self {
        Self::new(vec![Step::delete(from, to)]).with_selection(Selection::caret(from))
    }

    /// Replace `[from, to)` with `text`; the caret ends after the new text
    pub fn replace(from: usize, to: usize, text: &str) -> Self {
        let content = Fragment::text(text);
        let caret = from + content.len();
        Self::new(vec![Step::Replace { from, to, content }]).with_selection(Selection::caret(caret))
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Map a position through every step of the batch
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.steps.iter().fold(pos, |p, step| step.map(p, assoc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Author;
    use chrono::{TimeZone, Utc};

    fn attribution() -> crate::annotation::Attribution {
        Author::new("u1", "Ada").attribution(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_step_serialization() {
        let step = Step::insert(3, Fragment::text("hi"));

        let json = serde_json::to_string(&step).unwrap();
        let deserialized: Step = serde_json::from_str(&json).unwrap();

        assert_eq!(step, deserialized);
    }

    #[test]
    fn test_replace_and_inverse() {
        let mut doc = Document::from_text("Hello world");
        let step = Step::Replace {
            from: 6,
            to: 11,
            content: Fragment::text("there"),
        };

        let inverse = step.apply(&mut doc).unwrap();
        assert_eq!(doc.text(), "Hello there");

        inverse.apply(&mut doc).unwrap();
        assert_eq!(doc.text(), "Hello world");
    }

    #[test]
    fn test_add_mark_overwrites_other_tracking_kind() {
        let mut doc = Document::from_text("abc");
        Step::AddMark {
            from: 0,
            to: 3,
            mark: Mark::Tracking(Annotation::deletion(attribution())),
        }
        .apply(&mut doc)
        .unwrap();
        Step::AddMark {
            from: 1,
            to: 2,
            mark: Mark::Tracking(Annotation::insertion(attribution())),
        }
        .apply(&mut doc)
        .unwrap();

        assert!(doc.units()[0].is_deletion());
        assert!(doc.units()[1].is_insertion());
        assert!(!doc.units()[1].is_deletion());
    }

    #[test]
    fn test_remove_mark_only_clears_requested_kind() {
        let mut doc = Document::from_text("ab");
        doc.apply_batch(&[
            Step::AddMark {
                from: 0,
                to: 1,
                mark: Mark::Tracking(Annotation::insertion(attribution())),
            },
            Step::AddMark {
                from: 1,
                to: 2,
                mark: Mark::Tracking(Annotation::deletion(attribution())),
            },
        ])
        .unwrap();

        Step::RemoveMark {
            from: 0,
            to: 2,
            mark_type: MarkType::Deletion,
        }
        .apply(&mut doc)
        .unwrap();

        assert!(doc.units()[0].is_insertion());
        assert!(doc.units()[1].annotation().is_none());
    }

    #[test]
    fn test_apply_batch_is_atomic() {
        let mut doc = Document::from_text("abc");
        let result = doc.apply_batch(&[Step::delete(0, 1), Step::delete(5, 6)]);

        assert!(result.is_err());
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_apply_batch_inverses_restore() {
        let mut doc = Document::from_text("abc");
        let inverses = doc
            .apply_batch(&[Step::delete(0, 1), Step::insert(2, Fragment::text("xy"))])
            .unwrap();
        assert_eq!(doc.text(), "bcxy");

        doc.apply_batch(&inverses).unwrap();
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_map_positions() {
        let insert = Step::insert(2, Fragment::text("xyz"));
        assert_eq!(insert.map(1, Assoc::After), 1);
        assert_eq!(insert.map(2, Assoc::Before), 2);
        assert_eq!(insert.map(2, Assoc::After), 5);
        assert_eq!(insert.map(4, Assoc::After), 7);

        let delete = Step::delete(2, 5);
        assert_eq!(delete.map(3, Assoc::Before), 2);
        assert_eq!(delete.map(5, Assoc::Before), 2);
        assert_eq!(delete.map(8, Assoc::After), 5);
    }

    #[test]
    fn test_batch_helpers_carry_surface_caret() {
        assert_eq!(Batch::insert(5, " there").selection, Some(Selection::caret(11)));
        assert_eq!(Batch::delete(6, 11).selection, Some(Selection::caret(6)));
        assert_eq!(Batch::replace(1, 2, "x").selection, Some(Selection::caret(2)));
        assert_eq!(Batch::insert(0, "a").origin, Origin::Local);
    }
}
