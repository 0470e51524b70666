use std::ops::Range;

use crate::models::{Document, RunTags};

use super::selection::{OffsetEdit, Selection, translate};

/// Engine-side edits to a document, with the selection carried along.
///
/// Failed edits are logged and skipped; the selection is only translated for
/// edits that actually happened.
pub struct Surgery<'a> {
    pub doc: &'a mut Document,
    pub selection: &'a mut Selection,
    mutations: usize,
}

impl<'a> Surgery<'a> {
    pub fn new(doc: &'a mut Document, selection: &'a mut Selection) -> Self {
        Self {
            doc,
            selection,
            mutations: 0,
        }
    }

    /// Number of text insertions and removals applied so far.
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    pub fn insert(&mut self, at: usize, text: &str, tags: RunTags) -> bool {
        let len = text.chars().count();
        match self.doc.insert(at, text, tags) {
            Ok(()) if len > 0 => {
                log::trace!("insert {text:?} at {at}");
                *self.selection = translate(self.selection, OffsetEdit::Insert { at, len });
                self.mutations += 1;
                true
            }
            Ok(()) => false,
            Err(err) => {
                log::warn!("skipping insert of {text:?}: {err}");
                false
            }
        }
    }

    pub fn remove(&mut self, range: Range<usize>) -> bool {
        let at = range.start;
        let len = range.len();
        match self.doc.remove(range) {
            Ok(()) if len > 0 => {
                log::trace!("remove {len} chars at {at}");
                *self.selection = translate(self.selection, OffsetEdit::Remove { at, len });
                self.mutations += 1;
                true
            }
            Ok(()) => false,
            Err(err) => {
                log::warn!("skipping removal at {at}: {err}");
                false
            }
        }
    }

    /// Retag `range`; text and offsets are unchanged.
    pub fn retag(&mut self, range: Range<usize>, f: impl FnMut(&mut RunTags)) {
        if let Err(err) = self.doc.update_tags(range, f) {
            log::warn!("skipping retag: {err}");
        }
    }

    pub fn retag_per_char(&mut self, range: Range<usize>, f: impl FnMut(usize, &mut RunTags)) {
        if let Err(err) = self.doc.update_tags_per_char(range, f) {
            log::warn!("skipping retag: {err}");
        }
    }
}
