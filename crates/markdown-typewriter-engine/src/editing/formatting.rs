//! Formatting actions a host binds to toolbar buttons and key chords.
//!
//! Actions only rewrite text and tags. Prefixes and glyphs are put back in
//! their canonical form by the visibility pass that runs afterwards.

use std::ops::Range;

use crate::models::{BlockKind, Document, InlineIntent, Line, RunTags};
use crate::options::Glyphs;
use crate::parsing::delimiters::{InlineStyle, find_inline_spans};

use super::selection::Selection;
use super::surgery::Surgery;

const MAX_DEPTH: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattingAction {
    ToggleBold,
    ToggleItalic,
    ToggleCode,
    ToggleStrikethrough,
    Heading(u8),
    Paragraph,
    BulletList,
    OrderedList,
    TaskList,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    Link(String),
    ToggleTaskChecked,
    Indent,
    Outdent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inline {
    Bold,
    Italic,
    Code,
    Strike,
}

impl Inline {
    fn style(self) -> InlineStyle {
        match self {
            Inline::Bold => InlineStyle::Strong,
            Inline::Italic => InlineStyle::Emphasis,
            Inline::Code => InlineStyle::Code,
            Inline::Strike => InlineStyle::Strikethrough,
        }
    }

    fn present(self, tags: &RunTags) -> bool {
        match self {
            Inline::Bold => tags.inline.contains(InlineIntent::StronglyEmphasized),
            Inline::Italic => tags.inline.contains(InlineIntent::Emphasized),
            Inline::Code => tags.inline.contains(InlineIntent::Code),
            Inline::Strike => tags.strikethrough,
        }
    }

    /// `*` next to an existing `*` would merge into a longer run, so the
    /// underscore spelling is used there.
    fn delimiter(self, before: Option<char>, after: Option<char>) -> &'static str {
        let star_adjacent = before == Some('*') || after == Some('*');
        match self {
            Inline::Bold if star_adjacent => "__",
            Inline::Bold => "**",
            Inline::Italic if star_adjacent => "_",
            Inline::Italic => "*",
            Inline::Code => "`",
            Inline::Strike => "~~",
        }
    }
}

/// Apply `action` over `selection`. Returns whether the document changed.
pub fn apply_action(
    doc: &mut Document,
    selection: &mut Selection,
    action: &FormattingAction,
    glyphs: &Glyphs,
) -> bool {
    let before = doc.clone();
    let mut surgery = Surgery::new(doc, selection);
    match action {
        FormattingAction::ToggleBold => toggle_inline(&mut surgery, Inline::Bold),
        FormattingAction::ToggleItalic => toggle_inline(&mut surgery, Inline::Italic),
        FormattingAction::ToggleCode => toggle_inline(&mut surgery, Inline::Code),
        FormattingAction::ToggleStrikethrough => toggle_inline(&mut surgery, Inline::Strike),
        FormattingAction::Heading(level) => set_block(&mut surgery, BlockKind::heading(*level)),
        FormattingAction::Paragraph => set_block(&mut surgery, BlockKind::Paragraph),
        FormattingAction::BulletList => set_block(&mut surgery, BlockKind::BulletList),
        FormattingAction::OrderedList => set_block(&mut surgery, BlockKind::OrderedList),
        FormattingAction::TaskList => set_block(&mut surgery, BlockKind::TaskUnchecked),
        FormattingAction::Blockquote => set_block(&mut surgery, BlockKind::Blockquote),
        FormattingAction::CodeBlock => set_block(&mut surgery, BlockKind::CodeBlock),
        FormattingAction::HorizontalRule => insert_rule(&mut surgery, glyphs),
        FormattingAction::Link(target) => apply_link(&mut surgery, target),
        FormattingAction::ToggleTaskChecked => toggle_task_checked(&mut surgery),
        FormattingAction::Indent => shift_depth(&mut surgery, 1),
        FormattingAction::Outdent => shift_depth(&mut surgery, -1),
    }
    let changed = *doc != before;
    log::debug!("formatting {action:?}: changed={changed}");
    changed
}

/// Lines each range encloses. A non-empty range ending exactly at a line
/// start does not claim that line.
fn enclosing_lines(lines: &[Line], ranges: &[Range<usize>]) -> Vec<Line> {
    lines
        .iter()
        .filter(|line| {
            ranges.iter().any(|r| {
                r.start <= line.end
                    && r.end >= line.start
                    && !(r.end == line.start && !r.is_empty())
            })
        })
        .cloned()
        .collect()
}

fn with_newline(line: &Line) -> Range<usize> {
    if line.has_newline {
        line.start..line.end + 1
    } else {
        line.span()
    }
}

/// Remove synthetic markers, or the raw prefix when there are none.
fn strip_prefix(surgery: &mut Surgery<'_>, line: &Line) {
    if line.has_list_marker() {
        for marker in line.list_markers.iter().rev() {
            surgery.remove(marker.clone());
        }
        return;
    }
    let start = line.content_start();
    if start > line.start {
        surgery.remove(line.start..start);
    }
}

fn retag_line(surgery: &mut Surgery<'_>, line: &Line, f: impl FnMut(&mut RunTags)) {
    let fresh = surgery.doc.line_at(line.index, line.start);
    surgery.retag(with_newline(&fresh), f);
}

fn set_block(surgery: &mut Surgery<'_>, kind: BlockKind) {
    let lines = enclosing_lines(&surgery.doc.lines(), surgery.selection.ranges());
    let already = |k: Option<BlockKind>| match k {
        Some(k) if kind.is_task() => k.is_task(),
        Some(k) => k == kind,
        None => false,
    };
    let target = if !lines.is_empty() && lines.iter().all(|l| already(l.kind())) {
        BlockKind::Paragraph
    } else {
        kind
    };
    for line in lines.iter().rev() {
        let depth = line.kind().filter(|k| k.is_list()).map(|_| line.depth());
        strip_prefix(surgery, line);
        retag_line(surgery, line, |tags| tags.set_block(target, depth));
    }
}

fn toggle_task_checked(surgery: &mut Surgery<'_>) {
    let lines = enclosing_lines(&surgery.doc.lines(), surgery.selection.ranges());
    for line in lines.iter().rev() {
        let flipped = match line.kind() {
            Some(BlockKind::TaskChecked) => BlockKind::TaskUnchecked,
            Some(BlockKind::TaskUnchecked) => BlockKind::TaskChecked,
            _ => continue,
        };
        let depth = Some(line.depth());
        strip_prefix(surgery, line);
        retag_line(surgery, line, |tags| tags.set_block(flipped, depth));
    }
}

fn shift_depth(surgery: &mut Surgery<'_>, delta: i8) {
    let lines = enclosing_lines(&surgery.doc.lines(), surgery.selection.ranges());
    for line in lines.iter().rev() {
        let Some(kind) = line.kind().filter(|k| k.is_list()) else {
            continue;
        };
        let depth = line.depth().saturating_add_signed(delta).clamp(1, MAX_DEPTH);
        if depth == line.depth() {
            continue;
        }
        strip_prefix(surgery, line);
        retag_line(surgery, line, |tags| tags.set_block(kind, Some(depth)));
    }
}

fn inline_segments(surgery: &Surgery<'_>, range: &Range<usize>) -> Vec<(Line, Range<usize>)> {
    surgery
        .doc
        .lines()
        .into_iter()
        .filter_map(|line| {
            let start = range.start.max(line.content_start());
            let end = range.end.min(line.end);
            (start < end).then(|| (line, start..end))
        })
        .collect()
}

fn toggle_inline(surgery: &mut Surgery<'_>, intent: Inline) {
    let ranges: Vec<Range<usize>> = surgery
        .selection
        .ranges()
        .iter()
        .filter(|r| !r.is_empty())
        .cloned()
        .collect();
    for range in ranges.iter().rev() {
        let content: Vec<bool> = surgery
            .doc
            .pieces(range.clone())
            .iter()
            .filter(|(_, _, run)| !run.tags.is_list_marker && !run.tags.is_inline_marker)
            .flat_map(|(r, _, run)| std::iter::repeat_n(intent.present(&run.tags), r.len()))
            .collect();
        let active = !content.is_empty() && content.iter().all(|has| *has);
        for (line, segment) in inline_segments(surgery, range).into_iter().rev() {
            if active {
                unwrap_segment(surgery, &line, &segment, intent);
            } else {
                wrap_segment(surgery, &segment, intent);
            }
        }
    }
}

fn wrap_segment(surgery: &mut Surgery<'_>, segment: &Range<usize>, intent: Inline) {
    let text: Vec<char> = surgery.doc.slice_text(segment.clone()).chars().collect();
    let lead = text.iter().take_while(|c| c.is_whitespace()).count();
    let trail = text[lead..].iter().rev().take_while(|c| c.is_whitespace()).count();
    let start = segment.start + lead;
    let end = segment.end - trail;
    if start >= end {
        return;
    }
    let char_at = |offset: usize| surgery.doc.slice_text(offset..offset + 1).chars().next();
    let before = start.checked_sub(1).and_then(char_at);
    let after = char_at(end);
    let delimiter = intent.delimiter(before, after);

    let marker_tags = |tags: Option<&RunTags>| RunTags {
        is_inline_marker: true,
        ..tags.map(RunTags::typing_attributes).unwrap_or_default()
    };
    let close_tags = marker_tags(surgery.doc.tags_at(end - 1));
    let open_tags = marker_tags(surgery.doc.tags_at(start));
    surgery.insert(end, delimiter, close_tags);
    surgery.insert(start, delimiter, open_tags);
}

fn unwrap_segment(surgery: &mut Surgery<'_>, line: &Line, segment: &Range<usize>, intent: Inline) {
    let start = line.content_start();
    let text = surgery.doc.slice_text(start..line.end);
    let mut delimiters: Vec<Range<usize>> = find_inline_spans(&text)
        .into_iter()
        .filter(|span| span.style == intent.style())
        .filter(|span| {
            let content = span.content();
            start + content.start < segment.end && start + content.end > segment.start
        })
        .flat_map(|span| [span.open, span.close])
        .map(|r| start + r.start..start + r.end)
        .collect();
    delimiters.sort_by_key(|r| std::cmp::Reverse(r.start));
    for range in delimiters {
        surgery.remove(range);
    }
}

fn insert_rule(surgery: &mut Surgery<'_>, glyphs: &Glyphs) {
    let caret = surgery.selection.primary().end;
    let Some(line) = surgery.doc.lines().into_iter().find(|l| l.touches(caret)) else {
        return;
    };
    let rule_tags = RunTags::block(BlockKind::HorizontalRule);
    let marker_tags = RunTags {
        is_list_marker: true,
        ..rule_tags.clone()
    };
    let at = line.end;
    let glyph_len = glyphs.rule.chars().count();

    surgery.insert(at, "\n", line.tags.clone());
    surgery.insert(at + 1, &glyphs.rule, marker_tags);
    let newline = at + 1 + glyph_len;
    if line.has_newline {
        surgery.retag(newline..newline + 1, |tags| *tags = rule_tags.clone());
    } else {
        surgery.insert(newline, "\n", rule_tags.clone());
    }
    *surgery.selection = Selection::caret(newline + 1);
}

fn apply_link(surgery: &mut Surgery<'_>, target: &str) {
    let ranges: Vec<Range<usize>> = surgery.selection.ranges().to_vec();
    for range in ranges.iter().rev() {
        if range.is_empty() {
            let mut tags = range
                .start
                .checked_sub(1)
                .and_then(|p| surgery.doc.tags_at(p))
                .map(RunTags::typing_attributes)
                .unwrap_or_default();
            tags.link_target = Some(target.to_string());
            surgery.insert(range.start, target, tags);
        } else {
            surgery.retag_per_char(range.clone(), |_, tags| {
                if !tags.is_list_marker {
                    tags.link_target = Some(target.to_string());
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Run;
    use crate::options::EngineOptions;
    use crate::rendering::{MonospaceMeasurer, VisibilityPass};
    use pretty_assertions::assert_eq;

    fn pass(doc: &mut Document, selection: &mut Selection) {
        let options = EngineOptions::default();
        let measurer = MonospaceMeasurer::new(options.char_advance);
        VisibilityPass {
            options: &options,
            measurer: &measurer,
            read_only: false,
        }
        .run(doc, selection);
    }

    fn act(doc: &mut Document, selection: &mut Selection, action: FormattingAction) -> bool {
        let changed = apply_action(doc, selection, &action, &Glyphs::default());
        pass(doc, selection);
        changed
    }

    fn paragraph(text: &str) -> Document {
        Document::from_runs(vec![Run::new(text, RunTags::block(BlockKind::Paragraph))])
    }

    #[test]
    fn bold_wraps_and_unwraps_keeping_the_selection_on_content() {
        let mut doc = paragraph("hello world");
        let mut sel = Selection::range(0..5);
        assert!(act(&mut doc, &mut sel, FormattingAction::ToggleBold));
        assert_eq!(doc.text(), "**hello** world");
        assert_eq!(sel.ranges(), &[2..7]);
        assert!(doc.tags_at(3).is_some_and(|t| t.inline.contains(InlineIntent::StronglyEmphasized)));

        assert!(act(&mut doc, &mut sel, FormattingAction::ToggleBold));
        assert_eq!(doc.text(), "hello world");
        assert_eq!(sel.ranges(), &[0..5]);
    }

    #[test]
    fn italic_inside_bold_uses_underscores() {
        let mut doc = paragraph("**abc**");
        let mut sel = Selection::range(2..5);
        pass(&mut doc, &mut sel);
        act(&mut doc, &mut sel, FormattingAction::ToggleItalic);
        assert_eq!(doc.text(), "**_abc_**");
        let tags = doc.tags_at(4).cloned().unwrap_or_default();
        assert!(tags.inline.contains(InlineIntent::Emphasized));
        assert!(tags.inline.contains(InlineIntent::StronglyEmphasized));
    }

    #[test]
    fn carets_do_not_toggle_inline_styles() {
        let mut doc = paragraph("abc");
        let mut sel = Selection::caret(1);
        assert!(!apply_action(&mut doc, &mut sel, &FormattingAction::ToggleCode, &Glyphs::default()));
    }

    #[test]
    fn block_setter_toggles_back_to_paragraph() {
        let mut doc = paragraph("a\nb");
        let mut sel = Selection::range(0..3);
        act(&mut doc, &mut sel, FormattingAction::Heading(2));
        let kinds: Vec<_> = doc.lines().iter().map(Line::kind).collect();
        assert_eq!(kinds, vec![Some(BlockKind::Heading(2)); 2]);
        assert_eq!(doc.text(), "## a\n## b");

        act(&mut doc, &mut sel, FormattingAction::Heading(2));
        let kinds: Vec<_> = doc.lines().iter().map(Line::kind).collect();
        assert_eq!(kinds, vec![Some(BlockKind::Paragraph); 2]);
        assert_eq!(doc.text(), "a\nb");
    }

    #[test]
    fn switching_list_kind_replaces_the_glyph() {
        let mut doc = Document::plain("- one\nend");
        let mut sel = Selection::caret(9);
        pass(&mut doc, &mut sel);
        assert_eq!(doc.text(), "•one\nend");
        let mut sel = Selection::range(1..2);
        apply_action(&mut doc, &mut sel, &FormattingAction::OrderedList, &Glyphs::default());
        let mut away = Selection::caret(doc.len());
        pass(&mut doc, &mut away);
        assert_eq!(doc.text(), "1.one\nend");
    }

    #[test]
    fn horizontal_rule_goes_after_the_caret_line() {
        let mut doc = paragraph("abc");
        let mut sel = Selection::caret(1);
        act(&mut doc, &mut sel, FormattingAction::HorizontalRule);
        assert_eq!(doc.text(), "abc\n⎯⎯⎯\n");
        assert_eq!(sel, Selection::caret(8));
        assert_eq!(doc.lines()[1].kind(), Some(BlockKind::HorizontalRule));
    }

    #[test]
    fn link_on_a_caret_inserts_the_target() {
        let mut doc = paragraph("see ");
        let mut sel = Selection::caret(4);
        act(&mut doc, &mut sel, FormattingAction::Link("https://x.org".into()));
        assert_eq!(doc.text(), "see https://x.org");
        assert_eq!(sel, Selection::caret(17));
        assert_eq!(
            doc.tags_at(5).and_then(|t| t.link_target.clone()),
            Some("https://x.org".to_string())
        );
    }

    #[test]
    fn task_checking_and_depth_changes() {
        let mut doc = Document::from_runs(vec![Run::new(
            "todo",
            RunTags::list(BlockKind::TaskUnchecked, 1, None),
        )]);
        let mut sel = Selection::caret(0);
        act(&mut doc, &mut sel, FormattingAction::ToggleTaskChecked);
        assert_eq!(doc.lines()[0].kind(), Some(BlockKind::TaskChecked));
        assert_eq!(doc.text(), "- [x] todo");

        act(&mut doc, &mut sel, FormattingAction::Indent);
        assert_eq!(doc.lines()[0].depth(), 2);
        assert_eq!(doc.text(), "  - [x] todo");

        act(&mut doc, &mut sel, FormattingAction::Outdent);
        act(&mut doc, &mut sel, FormattingAction::Outdent);
        assert_eq!(doc.lines()[0].depth(), 1);
        assert_eq!(doc.text(), "- [x] todo");
    }
}
