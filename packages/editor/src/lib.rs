//! # Redline Editor
//!
//! Track-changes engine for a structured rich-text document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ editing surface: keystrokes → Batch         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: single-writer submit path           │
//! │  - Composition gate classifies the input    │
//! │  - Interceptor retains + annotates removals │
//! │  - Atomic commit through the pipeline       │
//! │  - Cursor reconciler corrects the caret     │
//! │  - Undo/redo, review, timed highlights      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ presentation: annotations() enumeration     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Nothing removed is lost**: with tracking on, removed content stays
//!    in the document as a Deletion until someone accepts it
//! 2. **One annotation per unit**: Insertion and Deletion never overlap
//! 3. **Whole batches only**: a batch commits completely or not at all
//! 4. **Replays are not edits**: history, remote and review batches bypass
//!    the interceptor
//!
//! ## Usage
//!
//! ```rust,ignore
//! use redline_editor::{Batch, Document, Editor, EditorConfig, ReviewScope};
//!
//! let mut editor = Editor::new(Document::from_text("Hello world"), &EditorConfig::default());
//! editor.update_author("u1", "Ada");
//! editor.set_tracking_enabled(true);
//!
//! editor.submit(Batch::insert(5, " there"))?;
//! assert_eq!(editor.annotations().len(), 1);
//!
//! editor.reject(ReviewScope::Document)?;
//! assert_eq!(editor.text(), "Hello world");
//! ```
//!
//! ### Collaborative editing
//!
//! ```rust,ignore
//! // Requires the "collaboration" feature
//! let mut mirror = SyncMirror::new(editor.document());
//! let update = mirror.publish(editor.document());
//!
//! if let Some(batch) = mirror.remote_batch(&peer_update)? {
//!     editor.submit(batch)?;
//! }
//! ```

mod annotation;
mod clock;
mod composition;
mod config;
mod cursor;
mod document;
mod editor;
mod errors;
mod highlight;
mod interceptor;
mod mutations;
mod pipeline;
mod review;
mod session;
mod undo_stack;

#[cfg(feature = "collaboration")]
mod crdt;

pub use annotation::{
    merge_window, quantize_minute, Annotation, AnnotationKind, AnnotationSpan, Attribution, Author,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use composition::{CompositionGate, CompositionPhase};
pub use config::{EditorConfig, HighlightConfig, HistoryConfig, TrackingConfig};
pub use cursor::{caret_rule, reconcile, reconcile_selection, CaretRule};
pub use document::{Block, Document, Fragment, Glyph, Highlight, Inline, Marks, Unit, ATOM_PLACEHOLDER};
pub use editor::{CommitOutcome, CommitReport, Editor};
pub use errors::EditorError;
pub use highlight::{resolve_lines, HighlightRequest, Timer, TimerKey, TimerQueue};
pub use interceptor::{guard, intercept, GuardReason, Interception, OffsetMap};
pub use mutations::{Assoc, Batch, Mark, MarkType, Origin, Selection, Step, StepError};
pub use pipeline::{Pipeline, PipelineResult};
pub use review::{ReviewAction, ReviewPlan, ReviewReport, ReviewScope};
pub use session::TrackingSession;
pub use undo_stack::{HistoryEntry, UndoStack};

#[cfg(feature = "collaboration")]
pub use crdt::{CrdtError, SyncMirror};
