//! Making sense of an edit the host already applied.
//!
//! The host mutates the document itself and hands back the previous state.
//! Reconciliation finds the single edited span and fixes up the tags the
//! host cannot know about: kinds whose raw prefix was edited, list and
//! quote continuation, and leaving a list with Enter on an empty item.

use std::ops::Range;

use crate::models::{BlockKind, Document, Line};
use crate::parsing::patterns::{canonical_prefix, infer_prefix};

use super::selection::Selection;
use super::surgery::Surgery;

/// One contiguous replacement, in char offsets of the previous text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSpan {
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl EditSpan {
    /// Inserted chars, in offsets of the current text.
    pub fn inserted_range(&self) -> Range<usize> {
        self.start..self.start + self.inserted
    }
}

/// Find the edited span. When the edit is ambiguous (typing a char next to
/// an identical one) it is placed to end at `caret`.
pub fn diff_text(previous: &str, current: &str, caret: Option<usize>) -> Option<EditSpan> {
    let old: Vec<char> = previous.chars().collect();
    let new: Vec<char> = current.chars().collect();
    let mut prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    if let Some(caret) = caret {
        let grown = new.len().saturating_sub(old.len());
        prefix = prefix.min(caret.saturating_sub(grown));
    }
    let room = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(room)
        .take_while(|(a, b)| a == b)
        .count();
    let removed = old.len() - prefix - suffix;
    let inserted = new.len() - prefix - suffix;
    (removed > 0 || inserted > 0).then_some(EditSpan {
        start: prefix,
        removed,
        inserted,
    })
}

/// What reconciliation found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub edit: EditSpan,
    /// The inserted text, for the shortcut processor.
    pub inserted: String,
    /// Enter on an empty item was turned into leaving the list.
    pub exited_block: bool,
}

fn continues(kind: BlockKind) -> bool {
    kind.is_list()
        || matches!(
            kind,
            BlockKind::Blockquote | BlockKind::CodeBlock | BlockKind::HtmlBlock
        )
}

fn with_newline(line: &Line) -> Range<usize> {
    if line.has_newline {
        line.start..line.end + 1
    } else {
        line.span()
    }
}

fn line_touching(doc: &Document, offset: usize) -> Option<Line> {
    doc.lines().into_iter().find(|l| l.touches(offset))
}

pub fn reconcile(
    doc: &mut Document,
    selection: &mut Selection,
    previous: &Document,
    edit: EditSpan,
) -> Reconciled {
    let inserted = doc.slice_text(edit.inserted_range());
    let mut surgery = Surgery::new(doc, selection);

    // Typed text never becomes a marker, whatever the host copied.
    surgery.retag(edit.inserted_range(), |tags| {
        tags.is_list_marker = false;
        tags.is_inline_marker = false;
    });

    let exited_block = if inserted == "\n" && edit.removed == 0 {
        handle_newline(&mut surgery, previous, edit.start)
    } else {
        reinfer_prefix_edit(&mut surgery, previous, edit);
        false
    };

    Reconciled {
        edit,
        inserted,
        exited_block,
    }
}

/// Returns whether the newline was consumed to leave a list or quote.
fn handle_newline(surgery: &mut Surgery<'_>, previous: &Document, at: usize) -> bool {
    let Some(before) = line_touching(previous, at) else {
        return false;
    };
    let Some(kind) = before.kind() else {
        return false;
    };
    let was_empty = before.content_start() >= before.end;

    if was_empty && (kind.is_list() || kind == BlockKind::Blockquote) {
        surgery.remove(at..at + 1);
        let Some(line) = line_touching(surgery.doc, at) else {
            return true;
        };
        if line.has_list_marker() {
            for marker in line.list_markers.iter().rev() {
                surgery.remove(marker.clone());
            }
        } else if line.content_start() > line.start {
            surgery.remove(line.start..line.content_start());
        }
        let line = surgery.doc.line_at(line.index, line.start);
        surgery.retag(with_newline(&line), |tags| {
            tags.set_block(BlockKind::Paragraph, None)
        });
        log::debug!("enter on empty {kind:?} line {} left the block", line.index);
        return true;
    }

    let Some(next) = line_touching(surgery.doc, at + 1) else {
        return false;
    };
    if next.tags.hard_break {
        surgery.retag(with_newline(&next), |tags| tags.hard_break = false);
    }
    let next_empty = next.span().is_empty();
    let new_kind = match kind {
        BlockKind::TaskChecked => BlockKind::TaskUnchecked,
        k if continues(k) => k,
        _ if next_empty => BlockKind::Paragraph,
        _ => return false,
    };
    let depth = Some(before.depth());

    if next_empty && !next.has_newline {
        // A line with no chars cannot carry tags, so a continued item at the
        // end of the document gets its prefix typed for it.
        let mut tags = before.tags.clone();
        tags.set_block(new_kind, depth);
        let prefix = canonical_prefix(new_kind, before.depth(), next_ordinal(&before));
        surgery.insert(next.start, &prefix, tags);
    } else if new_kind != kind || next_empty {
        surgery.retag(with_newline(&next), |tags| tags.set_block(new_kind, depth));
    }
    false
}

/// The ordinal after the one shown on `line`, raw or as a glyph.
fn next_ordinal(line: &Line) -> usize {
    line.text
        .trim_start()
        .split(['.', ')'])
        .next()
        .and_then(|n| n.parse::<usize>().ok())
        .map_or(1, |n| n + 1)
}

/// An edit inside the raw prefix of a line showing it re-infers the kind
/// from the text: erasing `# ` demotes, typing `#` promotes.
fn reinfer_prefix_edit(surgery: &mut Surgery<'_>, previous: &Document, edit: EditSpan) {
    let Some(before) = line_touching(previous, edit.start) else {
        return;
    };
    let Some(kind) = before.kind().filter(|k| k.is_marker_bearing()) else {
        return;
    };
    if before.has_list_marker() || edit.start >= before.content_start() {
        return;
    }
    let Some(line) = line_touching(surgery.doc, edit.start) else {
        return;
    };
    let (new_kind, depth) = match infer_prefix(&line.text) {
        Some(found) => (found.kind, Some(found.depth)),
        None => (BlockKind::Paragraph, None),
    };
    if Some(new_kind) == line.kind() && depth.unwrap_or(1) == line.depth() {
        return;
    }
    log::debug!("prefix edit turned {kind:?} line {} into {new_kind:?}", line.index);
    surgery.retag(with_newline(&line), |tags| tags.set_block(new_kind, depth));
}
