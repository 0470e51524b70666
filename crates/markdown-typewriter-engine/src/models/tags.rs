use super::block_kind::{BlockKind, ColumnAlignment};

/// A single character-run formatting intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineIntent {
    Emphasized,
    StronglyEmphasized,
    Code,
}

impl InlineIntent {
    fn bit(self) -> u8 {
        match self {
            InlineIntent::Emphasized => 0b001,
            InlineIntent::StronglyEmphasized => 0b010,
            InlineIntent::Code => 0b100,
        }
    }
}

/// Set of [`InlineIntent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InlineIntents(u8);

impl InlineIntents {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, intent: InlineIntent) -> bool {
        self.0 & intent.bit() != 0
    }

    pub fn insert(&mut self, intent: InlineIntent) {
        self.0 |= intent.bit();
    }

    pub fn remove(&mut self, intent: InlineIntent) {
        self.0 &= !intent.bit();
    }

    pub fn with(mut self, intent: InlineIntent) -> Self {
        self.insert(intent);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Marks the text of a table row as cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCell {
    pub header: bool,
    pub alignment: ColumnAlignment,
}

/// Semantic tags carried by a run. Styles are derived from these.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunTags {
    pub block_kind: Option<BlockKind>,
    pub list_depth: Option<u8>,
    /// Structural list identity from the importer (one per parsed list).
    pub list_id: Option<u32>,
    pub inline: InlineIntents,
    pub strikethrough: bool,
    pub link_target: Option<String>,
    /// Synthetic glyph inserted by the engine (bullet, ordinal, checkbox...).
    pub is_list_marker: bool,
    /// Emphasis or code delimiter located and tagged by the engine.
    pub is_inline_marker: bool,
    /// The line's raw prefix was taken off with no glyph in its place, so
    /// its text starts with content even when that content looks like a
    /// prefix.
    pub prefix_hidden: bool,
    /// The line continues the block of the line before it across a hard
    /// line break.
    pub hard_break: bool,
    pub table_cell: Option<TableCell>,
    pub code_language: Option<String>,
}

impl RunTags {
    pub fn block(kind: BlockKind) -> Self {
        Self {
            block_kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn list(kind: BlockKind, depth: u8, list_id: Option<u32>) -> Self {
        Self {
            block_kind: Some(kind),
            list_depth: Some(depth.max(1)),
            list_id,
            ..Self::default()
        }
    }

    /// Only the line-level tags: kind, depth, list identity, prefix and break
    /// state, table and fence info.
    pub fn line_tags(&self) -> Self {
        Self {
            block_kind: self.block_kind,
            list_depth: self.list_depth,
            list_id: self.list_id,
            prefix_hidden: self.prefix_hidden,
            hard_break: self.hard_break,
            table_cell: self.table_cell,
            code_language: self.code_language.clone(),
            ..Self::default()
        }
    }

    /// Attributes newly typed text picks up from the character before it.
    pub fn typing_attributes(&self) -> Self {
        Self {
            is_list_marker: false,
            is_inline_marker: false,
            ..self.clone()
        }
    }

    /// Overwrite the line-level tags, keeping inline formatting.
    pub fn set_block(&mut self, kind: BlockKind, depth: Option<u8>) {
        self.block_kind = Some(kind);
        self.prefix_hidden = false;
        self.hard_break = false;
        if kind.is_list() {
            self.list_depth = Some(depth.unwrap_or(1).max(1));
        } else {
            self.list_depth = None;
            self.list_id = None;
        }
        if kind != BlockKind::TableRow {
            self.table_cell = None;
        }
        if kind != BlockKind::CodeBlock {
            self.code_language = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_behave_like_a_set() {
        let mut set = InlineIntents::empty().with(InlineIntent::Code);
        assert!(set.contains(InlineIntent::Code));
        assert!(!set.contains(InlineIntent::Emphasized));
        set.insert(InlineIntent::Emphasized);
        set.remove(InlineIntent::Code);
        assert!(set.contains(InlineIntent::Emphasized));
        assert!(!set.contains(InlineIntent::Code));
    }

    #[test]
    fn typing_attributes_drop_marker_flags() {
        let tags = RunTags {
            is_list_marker: true,
            is_inline_marker: true,
            strikethrough: true,
            ..RunTags::block(BlockKind::BulletList)
        };
        let typed = tags.typing_attributes();
        assert!(!typed.is_list_marker);
        assert!(!typed.is_inline_marker);
        assert!(typed.strikethrough);
        assert_eq!(typed.block_kind, Some(BlockKind::BulletList));
    }

    #[test]
    fn set_block_clears_list_fields_for_non_lists() {
        let mut tags = RunTags::list(BlockKind::OrderedList, 2, Some(7));
        tags.set_block(BlockKind::Heading(2), None);
        assert_eq!(tags.list_depth, None);
        assert_eq!(tags.list_id, None);
    }

    #[test]
    fn hidden_prefix_state_is_line_level_and_reset_by_a_new_kind() {
        let mut tags = RunTags {
            prefix_hidden: true,
            strikethrough: true,
            ..RunTags::block(BlockKind::Heading(1))
        };
        assert!(tags.line_tags().prefix_hidden);
        assert!(tags.typing_attributes().prefix_hidden);
        tags.set_block(BlockKind::Heading(2), None);
        assert!(!tags.prefix_hidden);
    }
}
