//! # Annotation Model
//!
//! The two tracking annotation kinds and the attribution they carry.
//!
//! Attribution time is deliberately coarse: edits are stamped with the whole
//! minute they happened in, so consecutive keystrokes by one author produce
//! annotations with equal attributes and therefore coalesce into one run.
//! Two edits a few seconds apart that straddle a minute boundary do NOT merge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Kind of tracked change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Content that exists only provisionally
    Insertion,

    /// Content scheduled for removal but still physically present
    Deletion,
}

/// Identity of whoever is editing (opaque to the engine)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Attributes to stamp on annotations created at `now`
    pub fn attribution(&self, now: DateTime<Utc>) -> Attribution {
        Attribution {
            author_id: self.id.clone(),
            author_name: self.name.clone(),
            minute: quantize_minute(now),
        }
    }
}

/// Who made a change and (coarsely) when
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    pub author_id: String,
    pub author_name: String,

    /// Minutes since the Unix epoch, rounded to the nearest minute
    pub minute: i64,
}

/// A tracking annotation attached to a unit of content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,

    #[serde(flatten)]
    pub attribution: Attribution,
}

impl Annotation {
    pub fn insertion(attribution: Attribution) -> Self {
        Self {
            kind: AnnotationKind::Insertion,
            attribution,
        }
    }

    pub fn deletion(attribution: Attribution) -> Self {
        Self {
            kind: AnnotationKind::Deletion,
            attribution,
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.kind == AnnotationKind::Insertion
    }

    pub fn is_deletion(&self) -> bool {
        self.kind == AnnotationKind::Deletion
    }
}

/// One contiguous annotated run, as exposed to presentation layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSpan {
    pub kind: AnnotationKind,
    pub from: usize,
    pub to: usize,
    pub author_id: String,
    pub author_name: String,
    pub minute: i64,
}

impl AnnotationSpan {
    pub(crate) fn new(annotation: &Annotation, from: usize, to: usize) -> Self {
        Self {
            kind: annotation.kind,
            from,
            to,
            author_id: annotation.attribution.author_id.clone(),
            author_name: annotation.attribution.author_name.clone(),
            minute: annotation.attribution.minute,
        }
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    /// Same span clipped to `[from, to)`, or `None` when they don't overlap
    pub fn clip(&self, from: usize, to: usize) -> Option<Self> {
        let start = self.from.max(from);
        let end = self.to.min(to);
        (start < end).then(|| Self {
            from: start,
            to: end,
            ..self.clone()
        })
    }
}

/// Round a timestamp to the nearest whole minute (half a minute rounds up)
pub fn quantize_minute(at: DateTime<Utc>) -> i64 {
    (at.timestamp_millis() + MILLIS_PER_MINUTE / 2).div_euclid(MILLIS_PER_MINUTE)
}

/// Whether an edit at `now` should extend an annotation stamped at `last_edit`
pub fn merge_window(now: DateTime<Utc>, last_edit: DateTime<Utc>) -> bool {
    quantize_minute(now) == quantize_minute(last_edit)
}
