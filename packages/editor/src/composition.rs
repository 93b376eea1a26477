//! # Composition Gate
//!
//! Tracks multi-keystroke character entry (IME composition) so the caret
//! correction doesn't fight the input method.
//!
//! Composition engines re-issue overlapping replace steps while the user is
//! still picking a character. The first batch of a composition often replaces
//! a placeholder; the following ones rewrite the preview in place. Only the
//! phase is recorded here, [`crate::cursor`] decides what to do with it.
//!
//! ```text
//! begin() ──▶ ComposingStart ──(batch)──▶ Normal
//!                                          │ update()
//!                                          ▼
//!                                   ComposingContinue ──(batch)──▶ Normal
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompositionPhase {
    #[default]
    Normal,

    /// First batch of a composition session
    ComposingStart,

    /// Later batches of the same composition session
    ComposingContinue,
}

/// Composition events seen since the last processed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositionGate {
    started: bool,
    continuing: bool,
}

impl CompositionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composition session started
    pub fn begin(&mut self) {
        self.started = true;
    }

    /// Composition preview changed
    pub fn update(&mut self) {
        self.continuing = true;
    }

    /// Composition confirmed or cancelled
    pub fn end(&mut self) {
        self.reset();
    }

    /// Phase of the next batch.
    ///
    /// A start counts on its own, with or without an update after it, so a
    /// combined replace opening a composition keeps the caret where the input
    /// method put it instead of moving it past the struck text.
    pub fn phase(&self) -> CompositionPhase {
        match (self.started, self.continuing) {
            (true, _) => CompositionPhase::ComposingStart,
            (false, true) => CompositionPhase::ComposingContinue,
            (false, false) => CompositionPhase::Normal,
        }
    }

    /// Forget the events once a batch has been processed
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_batch_of_composition_is_start() {
        let mut gate = CompositionGate::new();
        gate.begin();
        gate.update();
        assert_eq!(gate.phase(), CompositionPhase::ComposingStart);

        gate.reset();
        gate.update();
        assert_eq!(gate.phase(), CompositionPhase::ComposingContinue);
    }

    #[test]
    fn test_start_without_update_is_start() {
        let mut gate = CompositionGate::new();
        gate.begin();
        assert_eq!(gate.phase(), CompositionPhase::ComposingStart);

        gate.reset();
        assert_eq!(gate.phase(), CompositionPhase::Normal);
    }

    #[test]
    fn test_end_returns_to_normal() {
        let mut gate = CompositionGate::new();
        gate.begin();
        gate.end();
        assert_eq!(gate.phase(), CompositionPhase::Normal);
    }
}
