//! # Document Model
//!
//! The canonical document the engine reads and submits steps against.
//!
//! Content is stored flattened: every unit (a character, an embedded atom or
//! a block break) occupies exactly one position, so a document of `n` units
//! has positions `0..=n`. The tree the editing surface works with (blocks of
//! inline runs) is a view computed from that sequence.
//!
//! ```text
//! "Hi\nyou"   →   H  i  ⏎  y  o  u
//!                0  1  2  3  4  5  6
//!                └ block ┘  └ block ┘
//! ```
//!
//! Each unit carries at most one tracking annotation, so a run can never be
//! Insertion and Deletion at the same time.

use crate::annotation::{Annotation, AnnotationKind, AnnotationSpan};
use crate::mutations::{Step, StepError};
use serde::{Deserialize, Serialize};

/// Placeholder character used for atoms in text snapshots
pub const ATOM_PLACEHOLDER: char = '\u{FFFC}';

/// What a single position holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Glyph {
    Char(char),

    /// Embedded object (image, mention, ...) identified by name
    Atom(String),

    /// Boundary between two blocks
    Break,
}

/// Formatting highlight (never tracked)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub color: String,
}

/// Marks attached to a unit
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<Annotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub glyph: Glyph,

    #[serde(default)]
    pub marks: Marks,
}

impl Unit {
    pub fn plain(glyph: Glyph) -> Self {
        Self {
            glyph,
            marks: Marks::default(),
        }
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.marks.tracking.as_ref()
    }

    pub fn is_insertion(&self) -> bool {
        self.annotation().is_some_and(Annotation::is_insertion)
    }

    pub fn is_deletion(&self) -> bool {
        self.annotation().is_some_and(Annotation::is_deletion)
    }

    fn push_text(&self, out: &mut String) {
        match &self.glyph {
            Glyph::Char(c) => out.push(*c),
            Glyph::Atom(_) => out.push(ATOM_PLACEHOLDER),
            Glyph::Break => out.push('\n'),
        }
    }
}

fn glyph_for(c: char) -> Glyph {
    if c == '\n' {
        Glyph::Break
    } else {
        Glyph::Char(c)
    }
}

/// Slice of content carried by a replace step
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment {
    units: Vec<Unit>,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Unmarked content for `text` (`'\n'` becomes a block break)
    pub fn text(text: &str) -> Self {
        Self {
            units: text.chars().map(|c| Unit::plain(glyph_for(c))).collect(),
        }
    }

    pub fn atom(name: impl Into<String>) -> Self {
        Self {
            units: vec![Unit::plain(Glyph::Atom(name.into()))],
        }
    }

    pub fn from_units(units: Vec<Unit>) -> Self {
        Self { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<Unit> {
        self.units
    }

    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.units.len());
        for unit in &self.units {
            unit.push_text(&mut out);
        }
        out
    }

    /// Same content with every unit's tracking annotation replaced
    pub fn with_tracking(mut self, annotation: Option<&Annotation>) -> Self {
        for unit in &mut self.units {
            unit.marks.tracking = annotation.cloned();
        }
        self
    }

    /// Units that are not provisional insertions
    pub fn without_insertions(self) -> Self {
        Self {
            units: self.units.into_iter().filter(|u| !u.is_insertion()).collect(),
        }
    }
}

/// A block of the tree view (paragraph between two breaks)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub from: usize,
    pub to: usize,
    pub children: Vec<Inline>,
}

/// Inline child of a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Maximal run of characters sharing the same marks
    Text {
        from: usize,
        to: usize,
        text: String,
        marks: Marks,
    },
    Atom {
        from: usize,
        to: usize,
        name: String,
        marks: Marks,
    },
}

impl Inline {
    pub fn range(&self) -> (usize, usize) {
        match self {
            Inline::Text { from, to, .. } | Inline::Atom { from, to, .. } => (*from, *to),
        }
    }

    pub fn marks(&self) -> &Marks {
        match self {
            Inline::Text { marks, .. } | Inline::Atom { marks, .. } => marks,
        }
    }
}

/// Rich-text document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    units: Vec<Unit>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            units: Fragment::text(text).into_units(),
        }
    }

    pub fn from_units(units: Vec<Unit>) -> Self {
        Self { units }
    }

    /// Number of positions content occupies
    pub fn size(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Plain text snapshot, including content pending deletion
    pub fn text(&self) -> String {
        self.text_filtered(|_| true)
    }

    /// Text as it would read after accepting every change
    pub fn accepted_text(&self) -> String {
        self.text_filtered(|u| !u.is_deletion())
    }

    /// Text as it would read after rejecting every change
    pub fn original_text(&self) -> String {
        self.text_filtered(|u| !u.is_insertion())
    }

    fn text_filtered(&self, keep: impl Fn(&Unit) -> bool) -> String {
        let mut out = String::with_capacity(self.units.len());
        for unit in self.units.iter().filter(|u| keep(u)) {
            unit.push_text(&mut out);
        }
        out
    }

    pub fn check_range(&self, from: usize, to: usize) -> Result<(), StepError> {
        if from > to {
            return Err(StepError::InvertedRange { from, to });
        }
        if to > self.size() {
            return Err(StepError::OutOfBounds {
                from,
                to,
                size: self.size(),
            });
        }
        Ok(())
    }

    pub fn slice(&self, from: usize, to: usize) -> Result<Fragment, StepError> {
        self.check_range(from, to)?;
        Ok(Fragment::from_units(self.units[from..to].to_vec()))
    }

    /// Replace `[from, to)` with `content`, returning what was removed
    pub(crate) fn splice(
        &mut self,
        from: usize,
        to: usize,
        content: Fragment,
    ) -> Result<Fragment, StepError> {
        self.check_range(from, to)?;
        let removed = self.units.splice(from..to, content.into_units()).collect();
        Ok(Fragment::from_units(removed))
    }

    pub(crate) fn units_mut(&mut self, from: usize, to: usize) -> Result<&mut [Unit], StepError> {
        self.check_range(from, to)?;
        Ok(&mut self.units[from..to])
    }

    /// Apply steps atomically.
    ///
    /// Steps are applied to a copy that replaces this document only when all
    /// of them succeed. Returns the inverse steps in the order they must be
    /// applied to undo the batch.
    pub fn apply_batch(&mut self, steps: &[Step]) -> Result<Vec<Step>, StepError> {
        let mut next = self.clone();
        let mut inverses = Vec::with_capacity(steps.len());
        for step in steps {
            inverses.push(step.apply(&mut next)?);
        }
        inverses.reverse();
        *self = next;
        Ok(inverses)
    }

    /// Every tracked run in position order
    pub fn annotations(&self) -> Vec<AnnotationSpan> {
        let mut spans: Vec<AnnotationSpan> = Vec::new();
        let mut run: Option<(usize, &Annotation)> = None;

        for (pos, unit) in self.units.iter().enumerate() {
            let current = unit.annotation();
            match (run, current) {
                (Some((_, open)), Some(next)) if open == next => {}
                _ => {
                    if let Some((start, open)) = run.take() {
                        spans.push(AnnotationSpan::new(open, start, pos));
                    }
                    run = current.map(|a| (pos, a));
                }
            }
        }
        if let Some((start, open)) = run {
            spans.push(AnnotationSpan::new(open, start, self.units.len()));
        }
        spans
    }

    /// Tracked runs overlapping `[from, to)`, clipped to it
    pub fn annotations_between(&self, from: usize, to: usize) -> Vec<AnnotationSpan> {
        self.annotations()
            .iter()
            .filter_map(|span| span.clip(from, to))
            .collect()
    }

    /// Full extent of the tracked run touching `pos`.
    ///
    /// The unit before the position wins over the unit after it, the same
    /// way marks are inherited while typing.
    pub fn annotation_at(&self, pos: usize) -> Option<AnnotationSpan> {
        if pos > self.size() {
            return None;
        }
        let index = [pos.checked_sub(1), Some(pos)]
            .into_iter()
            .flatten()
            .find(|&i| self.units.get(i).is_some_and(|u| u.annotation().is_some()))?;
        let annotation = self.units[index].annotation()?;

        let mut start = index;
        while start > 0 && self.units[start - 1].annotation() == Some(annotation) {
            start -= 1;
        }
        let mut end = index + 1;
        while end < self.units.len() && self.units[end].annotation() == Some(annotation) {
            end += 1;
        }
        Some(AnnotationSpan::new(annotation, start, end))
    }

    /// Total length of content carrying `kind`
    pub fn annotated_len(&self, kind: AnnotationKind) -> usize {
        self.units
            .iter()
            .filter(|u| u.annotation().is_some_and(|a| a.kind == kind))
            .count()
    }

    /// Tree view: blocks split on breaks, each holding maximal inline runs
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut block = Block {
            from: 0,
            to: 0,
            children: Vec::new(),
        };

        for (pos, unit) in self.units.iter().enumerate() {
            match &unit.glyph {
                Glyph::Break => {
                    block.to = pos;
                    let next_from = pos + 1;
                    blocks.push(std::mem::replace(
                        &mut block,
                        Block {
                            from: next_from,
                            to: next_from,
                            children: Vec::new(),
                        },
                    ));
                }
                Glyph::Atom(name) => block.children.push(Inline::Atom {
                    from: pos,
                    to: pos + 1,
                    name: name.clone(),
                    marks: unit.marks.clone(),
                }),
                Glyph::Char(c) => match block.children.last_mut() {
                    Some(Inline::Text { to, text, marks, .. }) if *marks == unit.marks => {
                        text.push(*c);
                        *to = pos + 1;
                    }
                    _ => block.children.push(Inline::Text {
                        from: pos,
                        to: pos + 1,
                        text: c.to_string(),
                        marks: unit.marks.clone(),
                    }),
                },
            }
        }
        block.to = self.units.len();
        blocks.push(block);
        blocks
    }
}
