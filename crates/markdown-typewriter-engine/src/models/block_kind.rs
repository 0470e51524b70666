use serde::{Deserialize, Serialize};

/// The structural role of a line.
///
/// Every place that branches on the kind of a line matches on this enum
/// exhaustively (importer, exporter, styling, marker logic), so adding a
/// variant is a compile-checked change everywhere at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Paragraph,
    /// ATX heading, level 1..=6.
    Heading(u8),
    BulletList,
    OrderedList,
    TaskChecked,
    TaskUnchecked,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    /// A paragraph holding exactly one image; text is the alt/caption.
    ImageCaption,
    BlankLine,
    HtmlBlock,
    /// A paragraph holding two or more images.
    Gallery,
    /// One row of a pipe table; cells are separated by `\t`.
    TableRow,
}

/// Lines that are joined with a single newline on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportGroup {
    List,
    Quote,
    Code,
    Html,
    Table,
}

impl BlockKind {
    pub const MAX_HEADING: u8 = 6;

    /// Heading kind for `level`, clamped into 1..=6.
    pub fn heading(level: u8) -> Self {
        BlockKind::Heading(level.clamp(1, Self::MAX_HEADING))
    }

    pub fn heading_level(self) -> Option<u8> {
        match self {
            BlockKind::Heading(level) => Some(level),
            _ => None,
        }
    }

    /// Kinds that carry a markdown prefix which is shown raw on the active
    /// line and replaced (or hidden) elsewhere.
    pub fn is_marker_bearing(self) -> bool {
        match self {
            BlockKind::Heading(_)
            | BlockKind::BulletList
            | BlockKind::OrderedList
            | BlockKind::TaskChecked
            | BlockKind::TaskUnchecked
            | BlockKind::Blockquote
            | BlockKind::HorizontalRule => true,
            BlockKind::Paragraph
            | BlockKind::CodeBlock
            | BlockKind::ImageCaption
            | BlockKind::BlankLine
            | BlockKind::HtmlBlock
            | BlockKind::Gallery
            | BlockKind::TableRow => false,
        }
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            BlockKind::BulletList
                | BlockKind::OrderedList
                | BlockKind::TaskChecked
                | BlockKind::TaskUnchecked
        )
    }

    pub fn is_task(self) -> bool {
        matches!(self, BlockKind::TaskChecked | BlockKind::TaskUnchecked)
    }

    /// Whether inline delimiters (`**`, `` ` `` ...) are interpreted on this line.
    pub fn parses_inline(self) -> bool {
        match self {
            BlockKind::CodeBlock
            | BlockKind::HtmlBlock
            | BlockKind::HorizontalRule
            | BlockKind::BlankLine
            | BlockKind::Gallery => false,
            BlockKind::Paragraph
            | BlockKind::Heading(_)
            | BlockKind::BulletList
            | BlockKind::OrderedList
            | BlockKind::TaskChecked
            | BlockKind::TaskUnchecked
            | BlockKind::Blockquote
            | BlockKind::ImageCaption
            | BlockKind::TableRow => true,
        }
    }

    pub fn export_group(self) -> Option<ExportGroup> {
        match self {
            BlockKind::BulletList
            | BlockKind::OrderedList
            | BlockKind::TaskChecked
            | BlockKind::TaskUnchecked => Some(ExportGroup::List),
            BlockKind::Blockquote => Some(ExportGroup::Quote),
            BlockKind::CodeBlock => Some(ExportGroup::Code),
            BlockKind::HtmlBlock => Some(ExportGroup::Html),
            BlockKind::TableRow => Some(ExportGroup::Table),
            BlockKind::Paragraph
            | BlockKind::Heading(_)
            | BlockKind::HorizontalRule
            | BlockKind::ImageCaption
            | BlockKind::BlankLine
            | BlockKind::Gallery => None,
        }
    }
}

/// Column alignment of a table, from the delimiter row (`:--`, `:-:`, `--:`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnAlignment {
    #[default]
    Left,
    Center,
    Right,
}
