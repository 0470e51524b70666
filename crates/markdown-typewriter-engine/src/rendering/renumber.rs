//! Ordinals for ordered-list lines. Purely visual: the exporter always
//! writes `1.` and never looks at these.

use std::collections::HashMap;

use crate::models::BlockKind;

/// The effective list facts of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLine {
    pub kind: BlockKind,
    pub depth: u8,
    pub list_id: Option<u32>,
    /// A later paragraph of a list item.
    pub item_paragraph: bool,
}

impl ListLine {
    pub fn new(kind: BlockKind, depth: u8, list_id: Option<u32>) -> Self {
        Self {
            kind,
            depth,
            list_id,
            item_paragraph: false,
        }
    }

    pub fn item_paragraph(depth: u8) -> Self {
        Self {
            item_paragraph: true,
            ..Self::new(BlockKind::Paragraph, depth, None)
        }
    }
}

/// Map line index to ordinal for every ordered-list line.
///
/// Lines with a structural identity count within it, and deeper lines in
/// between do not interrupt the count. Lines without one are grouped by
/// adjacency at one depth. A non-list line ends every group, except the
/// paragraphs that belong to an item.
pub fn renumber(lines: &[ListLine]) -> HashMap<usize, usize> {
    let mut ordinals = HashMap::new();
    let mut by_identity: HashMap<u32, usize> = HashMap::new();
    let mut fallback_groups = 0usize;
    // (depth, count) of the open fallback group.
    let mut fallback: Option<(u8, usize)> = None;

    for (index, line) in lines.iter().enumerate() {
        if line.item_paragraph {
            fallback = None;
            continue;
        }
        if !line.kind.is_list() {
            by_identity.clear();
            fallback = None;
            continue;
        }
        if line.kind != BlockKind::OrderedList {
            fallback = None;
            continue;
        }
        match line.list_id {
            Some(id) => {
                fallback = None;
                let count = by_identity.entry(id).or_insert(0);
                *count += 1;
                ordinals.insert(index, *count);
            }
            None => {
                let next = match fallback {
                    Some((depth, count)) if depth == line.depth => count + 1,
                    _ => {
                        fallback_groups += 1;
                        1
                    }
                };
                fallback = Some((line.depth, next));
                ordinals.insert(index, next);
            }
        }
    }
    log::trace!(
        "renumbered {} ordered lines, {fallback_groups} fallback groups",
        ordinals.len()
    );
    ordinals
}
