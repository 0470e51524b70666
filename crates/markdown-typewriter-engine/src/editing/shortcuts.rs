//! Markdown-style typing shortcuts: `# ` at the start of a paragraph makes it
//! a heading, `- ` a bullet item, and so on.

use crate::models::{BlockKind, Document};
use crate::parsing::patterns::infer_prefix;

use super::selection::Selection;

const CODE_FENCE: &str = "```";

fn trigger_kind(head: &str) -> Option<(BlockKind, u8)> {
    if head == CODE_FENCE {
        return Some((BlockKind::CodeBlock, 1));
    }
    if !head.ends_with(' ') {
        return None;
    }
    let found = infer_prefix(head).filter(|m| m.len == head.len())?;
    match found.kind {
        BlockKind::HorizontalRule => None,
        kind => Some((kind, found.depth)),
    }
}

/// Convert the caret line when `inserted` completed a trigger.
///
/// Returns the selection to adopt, with the caret where the trigger text
/// was, or `None` when nothing matched and the document is untouched.
pub fn process_shortcut(
    doc: &mut Document,
    selection: &Selection,
    inserted: &str,
) -> Option<Selection> {
    if !(inserted.ends_with(' ') || inserted.ends_with('`')) {
        return None;
    }
    let caret = selection.caret_offset()?;
    let line = doc.lines().into_iter().find(|l| l.touches(caret))?;
    let current = line.kind();
    let bullet_line = current == Some(BlockKind::BulletList);
    if !matches!(
        current,
        None | Some(BlockKind::Paragraph) | Some(BlockKind::BlankLine) | Some(BlockKind::BulletList)
    ) {
        return None;
    }

    let head = doc.slice_text(line.start..caret);
    let (kind, depth) = trigger_kind(&head)?;
    if bullet_line && !kind.is_task() {
        return None;
    }

    let trigger_len = caret - line.start;
    if let Err(err) = doc.remove(line.start..caret) {
        log::warn!("shortcut on line {} abandoned: {err}", line.index);
        return None;
    }
    let end = line.end - trigger_len + usize::from(line.has_newline);
    if let Err(err) = doc.update_tags(line.start..end, |tags| {
        tags.set_block(kind, Some(depth));
    }) {
        log::warn!("shortcut on line {} left untagged: {err}", line.index);
    }
    log::debug!("shortcut {head:?} turned line {} into {kind:?}", line.index);
    Some(Selection::caret(line.start))
}
