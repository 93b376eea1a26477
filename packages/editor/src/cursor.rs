//! # Cursor Reconciler
//!
//! The editing surface computes the caret as if removed content were gone.
//! With tracking on it is still there, so the caret is moved past it, except
//! where that feels wrong:
//!
//! - plain backspace/delete keeps the caret at the start of the new Deletion
//!   run, so the struck-through text grows away from the caret;
//! - mid-composition no correction is made at all;
//! - the first composition batch that replaces content isn't corrected
//!   either (it usually replaces a placeholder).
//!
//! Advancing maps the caret through the interceptor's offsets with
//! `Assoc::After`; every other rule maps with `Assoc::Before`.

use crate::composition::CompositionPhase;
use crate::interceptor::Interception;
use crate::mutations::{Assoc, Selection};

/// How the caret relates to the retained runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretRule {
    /// Land after retained content at the caret
    Advance,

    /// Stay in front of retained content at the caret
    Hold,
}

pub fn caret_rule(interception: &Interception, phase: CompositionPhase) -> CaretRule {
    if !interception.tracked {
        return CaretRule::Hold;
    }
    match phase {
        CompositionPhase::ComposingContinue => CaretRule::Hold,
        CompositionPhase::ComposingStart if interception.combined_replace => CaretRule::Hold,
        _ if !interception.combined_replace => CaretRule::Hold,
        _ => CaretRule::Advance,
    }
}

/// Corrected caret position for a caret the surface placed at `caret`
pub fn reconcile(caret: usize, interception: &Interception, phase: CompositionPhase) -> usize {
    let assoc = match caret_rule(interception, phase) {
        CaretRule::Advance => Assoc::After,
        CaretRule::Hold => Assoc::Before,
    };
    interception.offsets.map(caret, assoc)
}

/// Reconcile both ends of a selection and clamp it to the document
pub fn reconcile_selection(
    selection: Selection,
    interception: &Interception,
    phase: CompositionPhase,
    size: usize,
) -> Selection {
    selection
        .map_with(|pos| reconcile(pos, interception, phase))
        .clamp(size)
}
