//! Visual attributes derived from tags. Recomputed for every line on every
//! pass, so nothing here is ever read back.

use crate::models::{BlockKind, Color, InlineIntent, Line, ParagraphStyle, RunStyle, RunTags};
use crate::options::EngineOptions;

/// Line facts the style depends on besides the run's own tags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineContext {
    pub kind: BlockKind,
    pub depth: u8,
    pub active: bool,
}

pub fn paragraph_style(ctx: LineContext, options: &EngineOptions) -> ParagraphStyle {
    let base = options.base_font_size;
    let mut style = ParagraphStyle {
        spacing_after: base * 0.25,
        ..ParagraphStyle::default()
    };
    match ctx.kind {
        BlockKind::Heading(level) => {
            style.spacing_before = options.heading_size(level) * 0.5;
        }
        BlockKind::BulletList
        | BlockKind::OrderedList
        | BlockKind::TaskChecked
        | BlockKind::TaskUnchecked => {
            let depth = f32::from(ctx.depth.max(1));
            style.first_line_indent = options.list_indent * (depth - 1.0);
            style.head_indent = options.list_indent * depth;
            style.spacing_after = base * 0.1;
        }
        BlockKind::Blockquote => {
            style.first_line_indent = options.quote_indent;
            style.head_indent = options.quote_indent;
            style.background = Some(options.theme.quote_background);
        }
        BlockKind::CodeBlock => {
            style.spacing_after = 0.0;
            style.first_line_indent = options.quote_indent;
            style.head_indent = options.quote_indent;
            style.background = Some(options.theme.code_background);
        }
        BlockKind::HtmlBlock | BlockKind::TableRow => {
            style.spacing_after = 0.0;
        }
        BlockKind::Paragraph
        | BlockKind::HorizontalRule
        | BlockKind::ImageCaption
        | BlockKind::BlankLine
        | BlockKind::Gallery => {}
    }
    style
}

pub fn run_style(tags: &RunTags, ctx: LineContext, options: &EngineOptions) -> RunStyle {
    let theme = &options.theme;
    let mut style = RunStyle {
        font_size: options.base_font_size,
        foreground: theme.text,
        ..RunStyle::default()
    };

    match ctx.kind {
        BlockKind::Heading(level) => {
            style.font_size = options.heading_size(level);
            style.bold = true;
        }
        BlockKind::Blockquote => style.foreground = theme.quote_foreground,
        BlockKind::CodeBlock => {
            style.monospace = true;
            style.foreground = theme.code_foreground;
        }
        BlockKind::HtmlBlock => {
            style.monospace = true;
            style.foreground = theme.secondary;
        }
        BlockKind::HorizontalRule => style.foreground = theme.marker,
        BlockKind::ImageCaption | BlockKind::Gallery => {
            style.italic = true;
            style.foreground = theme.secondary;
        }
        BlockKind::TaskChecked => {
            style.strikethrough = true;
            style.foreground = theme.secondary;
        }
        BlockKind::Paragraph
        | BlockKind::BulletList
        | BlockKind::OrderedList
        | BlockKind::TaskUnchecked
        | BlockKind::BlankLine
        | BlockKind::TableRow => {}
    }

    if tags.is_list_marker {
        style.strikethrough = false;
        style.foreground = theme.marker;
        match ctx.kind {
            BlockKind::BulletList => {
                style.font_size *= 1.2;
                style.bold = true;
            }
            BlockKind::OrderedList => style.monospaced_digits = true,
            _ => {}
        }
        return style;
    }

    if tags.is_inline_marker {
        // Delimiters read as plain text while editing and vanish otherwise.
        if ctx.active {
            style.foreground = theme.marker;
        } else {
            style.hidden = true;
            style.font_size = 0.0;
            style.foreground = Color::CLEAR;
        }
        return style;
    }

    if tags.inline.contains(InlineIntent::StronglyEmphasized) {
        style.bold = true;
    }
    if tags.inline.contains(InlineIntent::Emphasized) {
        style.italic = true;
    }
    if tags.inline.contains(InlineIntent::Code) {
        style.monospace = true;
        style.foreground = theme.code_foreground;
        style.background = Some(theme.code_background);
    }
    if tags.strikethrough {
        style.strikethrough = true;
    }
    if tags.link_target.is_some() && !matches!(ctx.kind, BlockKind::ImageCaption | BlockKind::Gallery)
    {
        style.foreground = theme.accent;
        style.underline = true;
    }
    style
}

/// Rewrite the style of every run on `line`, its newline included.
pub fn style_line(
    doc: &mut crate::models::Document,
    line: &Line,
    ctx: LineContext,
    options: &EngineOptions,
) {
    let end = if line.has_newline { line.end + 1 } else { line.end };
    let paragraph = paragraph_style(ctx, options);
    let result = doc.update_styles(line.start..end, |tags, run, para| {
        *run = run_style(tags, ctx, options);
        *para = paragraph.clone();
    });
    if let Err(err) = result {
        log::warn!("skipping styling of line {}: {err}", line.index);
    }
}
