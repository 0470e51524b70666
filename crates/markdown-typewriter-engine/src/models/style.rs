//! Derived visual attributes.
//!
//! Nothing in here is authoritative: the styling step recomputes every field
//! from run tags, line kind and focus on each visibility pass.

use serde::{Deserialize, Serialize};

use super::block_kind::ColumnAlignment;

/// An sRGB colour with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const CLEAR: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Character-level style of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyle {
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
    /// Tabular figures, used for ordinals so `9.` and `10.` line up.
    pub monospaced_digits: bool,
    pub foreground: Color,
    pub background: Option<Color>,
    pub strikethrough: bool,
    pub underline: bool,
    /// Zero-size and transparent: inline delimiters on inactive lines.
    pub hidden: bool,
}

impl Default for RunStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            bold: false,
            italic: false,
            monospace: false,
            monospaced_digits: false,
            foreground: Color::rgb(0x1d, 0x1d, 0x1f),
            background: None,
            strikethrough: false,
            underline: false,
            hidden: false,
        }
    }
}

/// A tab stop used to lay out table columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabStop {
    pub location: f32,
    pub alignment: ColumnAlignment,
}

/// Paragraph-level style shared by every run of a line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphStyle {
    pub spacing_before: f32,
    pub spacing_after: f32,
    pub first_line_indent: f32,
    pub head_indent: f32,
    pub tab_stops: Vec<TabStop>,
    pub background: Option<Color>,
}
