//! # Collaboration Mirror
//!
//! Keeps a Yjs text in step with the document so peers converge on the same
//! content.
//!
//! Only the text travels. Annotations are local presentation of who changed
//! what; a peer's changes arrive as plain `Origin::RemoteSync` batches, which
//! the interceptor never tracks a second time.
//!
//! Yjs text offsets are UTF-8 byte offsets while document positions count
//! units (one char per unit in the text snapshot), so every edit is
//! translated between the two.

use crate::document::{Document, Fragment};
use crate::mutations::{Batch, Origin, Step};
use tracing::debug;
use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{Doc, GetString, ReadTxn, StateVector, Text, TextRef, Transact, Update};

const TEXT_NAME: &str = "content";

#[derive(Debug, thiserror::Error)]
pub enum CrdtError {
    #[error("Failed to decode: {0}")]
    DecodeError(String),

    #[error("Failed to apply update: {0}")]
    ApplyError(String),
}

/// One contiguous text change, in char positions
#[derive(Debug, Clone, PartialEq, Eq)]
struct TextEdit {
    from: usize,
    to: usize,
    inserted: String,
}

/// Yjs mirror of one document's text
pub struct SyncMirror {
    doc: Doc,
    text: TextRef,

    /// Text as of the last publish or remote update
    shadow: String,
}

impl SyncMirror {
    /// Mirror seeded with `document`'s current text
    pub fn new(document: &Document) -> Self {
        let doc = Doc::new();
        let text = doc.get_or_insert_text(TEXT_NAME);
        let shadow = document.text();
        {
            let mut txn = doc.transact_mut();
            text.insert(&mut txn, 0, &shadow);
        }
        Self { doc, text, shadow }
    }

    /// Mirror with no local content, to be filled from a peer's state
    pub fn empty() -> Self {
        let doc = Doc::new();
        let text = doc.get_or_insert_text(TEXT_NAME);
        Self {
            doc,
            text,
            shadow: String::new(),
        }
    }

    pub fn text(&self) -> String {
        let txn = self.doc.transact();
        self.text.get_string(&txn)
    }

    pub fn state_vector(&self) -> Vec<u8> {
        let txn = self.doc.transact();
        txn.state_vector().encode_v1()
    }

    /// Full state, for a peer joining late
    pub fn encode_state(&self) -> Vec<u8> {
        let txn = self.doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }

    /// Bring the mirror up to `document` and return the encoded update for peers
    pub fn publish(&mut self, document: &Document) -> Vec<u8> {
        let target = document.text();
        let before = {
            let txn = self.doc.transact();
            txn.state_vector()
        };

        if let Some(edit) = diff(&self.shadow, &target) {
            let start = byte_offset(&self.shadow, edit.from);
            let end = byte_offset(&self.shadow, edit.to);
            let mut txn = self.doc.transact_mut();
            if start < end {
                self.text.remove_range(&mut txn, start, end - start);
            }
            if !edit.inserted.is_empty() {
                self.text.insert(&mut txn, start, &edit.inserted);
            }
            debug!(from = edit.from, to = edit.to, inserted = edit.inserted.len(), "Published local edit");
        }
        self.shadow = target;

        let txn = self.doc.transact();
        txn.encode_state_as_update_v1(&before)
    }

    /// Apply a peer's update and translate it into a batch for `Editor::submit`.
    ///
    /// Returns `Ok(None)` when the update didn't change the text.
    pub fn remote_batch(&mut self, update: &[u8]) -> Result<Option<Batch>, CrdtError> {
        let update = Update::decode_v1(update).map_err(|e| CrdtError::DecodeError(e.to_string()))?;
        {
            let mut txn = self.doc.transact_mut();
            txn.apply_update(update)
                .map_err(|e| CrdtError::ApplyError(e.to_string()))?;
        }

        let current = self.text();
        let edit = diff(&self.shadow, &current);
        self.shadow = current;

        Ok(edit.map(|edit| {
            debug!(from = edit.from, to = edit.to, "Received remote edit");
            Batch::new(vec![Step::Replace {
                from: edit.from,
                to: edit.to,
                content: Fragment::text(&edit.inserted),
            }])
            .with_origin(Origin::RemoteSync)
        }))
    }
}

/// Smallest single replacement turning `old` into `new`
fn diff(old: &str, new: &str) -> Option<TextEdit> {
    if old == new {
        return None;
    }
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    Some(TextEdit {
        from: prefix,
        to: old.len() - suffix,
        inserted: new[prefix..new.len() - suffix].iter().collect(),
    })
}

fn byte_offset(text: &str, chars: usize) -> u32 {
    let offset = text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i);
    u32::try_from(offset).unwrap_or(u32::MAX)
}
