//! Error types for the editor

use crate::mutations::StepError;
use crate::review::ReviewAction;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Nothing to {action}: no tracked changes in range")]
    NoOp { action: ReviewAction },

    #[error("Invalid range {from}..{to} for document of size {size}")]
    InvalidRange { from: usize, to: usize, size: usize },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[cfg(feature = "collaboration")]
    #[error("CRDT error: {0}")]
    Crdt(#[from] crate::crdt::CrdtError),
}

impl EditorError {
    /// Whether the error means "nothing happened" rather than a failure
    pub fn is_noop(&self) -> bool {
        matches!(self, EditorError::NoOp { .. })
    }
}
