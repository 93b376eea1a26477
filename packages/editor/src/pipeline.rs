//! # Commit Pipeline
//!
//! Owns the canonical document and commits fully-formed step lists to it.
//!
//! A commit is all-or-nothing: the steps are applied to a copy and the copy
//! is swapped in only once every step succeeded, so readers never observe a
//! partially-applied batch. After each commit the annotation enumeration
//! handed to the presentation layer is recomputed and cached.

use crate::annotation::AnnotationSpan;
use crate::document::Document;
use crate::mutations::{Step, StepError};
use tracing::{debug, warn};

pub struct Pipeline {
    document: Document,
    version: u64,
    annotations: Vec<AnnotationSpan>,
}

impl Pipeline {
    pub fn new(document: Document) -> Self {
        let annotations = document.annotations();
        Self {
            document,
            version: 0,
            annotations,
        }
    }

    /// Apply `steps` atomically and bump the version
    pub fn commit(&mut self, steps: &[Step]) -> Result<PipelineResult, StepError> {
        let inverses = self.document.apply_batch(steps).map_err(|err| {
            warn!(error = %err, steps = steps.len(), "Rejected batch");
            err
        })?;

        self.version += 1;
        self.annotations = self.document.annotations();

        debug!(
            version = self.version,
            steps = steps.len(),
            size = self.document.size(),
            annotations = self.annotations.len(),
            "Committed batch"
        );

        Ok(PipelineResult {
            version: self.version,
            inverses,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Annotation enumeration as of the last commit
    pub fn annotations(&self) -> &[AnnotationSpan] {
        &self.annotations
    }
}

/// Result of one commit
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub version: u64,

    /// Inverse steps in undo order
    pub inverses: Vec<Step>,
}
