//! The prefix visibility pass: raw markdown prefixes on the lines the
//! selection touches, synthetic glyphs everywhere else.
//!
//! Lines are processed last to first so an edit on one line never moves
//! the offsets of a line still waiting to be processed.

use std::collections::HashMap;

use crate::editing::selection::Selection;
use crate::editing::surgery::Surgery;
use crate::models::{BlockKind, Document, InlineIntent, InlineIntents, Line, RunTags};
use crate::options::{EngineOptions, Glyphs};
use crate::parsing::delimiters::{InlineStyle, find_inline_spans};
use crate::parsing::patterns::{canonical_prefix, infer_prefix, raw_prefix_len};

use super::renumber::{ListLine, renumber};
use super::styling::{LineContext, style_line};
use super::table::{TextMeasurer, apply_table_layout};

/// What one pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassOutcome {
    /// Whether the document (text, tags or styles) or the selection differ
    /// from before the pass.
    pub changed: bool,
    pub lines: usize,
    /// Text insertions and removals the pass performed.
    pub mutations: usize,
}

pub struct VisibilityPass<'a> {
    pub options: &'a EngineOptions,
    pub measurer: &'a dyn TextMeasurer,
    /// Read-only documents show raw prefixes on every line.
    pub read_only: bool,
}

impl VisibilityPass<'_> {
    pub fn run(&self, doc: &mut Document, selection: &mut Selection) -> PassOutcome {
        let before_doc = doc.clone();
        let before_selection = selection.clone();
        *selection = selection.clamp(doc.len());

        let mut surgery = Surgery::new(doc, selection);
        assign_kinds(&mut surgery);

        let lines = surgery.doc.lines();
        let list_lines: Vec<ListLine> = lines
            .iter()
            .map(|l| match l.kind() {
                Some(BlockKind::Paragraph) if l.tags.list_depth.is_some() => {
                    ListLine::item_paragraph(l.depth())
                }
                kind => ListLine::new(
                    kind.unwrap_or(BlockKind::Paragraph),
                    l.depth(),
                    l.tags.list_id,
                ),
            })
            .collect();
        let ordinals = renumber(&list_lines);

        for line in lines.iter().rev() {
            self.process_line(&mut surgery, line.index, line.start, &ordinals);
        }
        let mutations = surgery.mutations();

        apply_table_layout(doc, self.measurer, self.options);

        let changed = *doc != before_doc || *selection != before_selection;
        log::debug!(
            "visibility pass: {} lines, {mutations} mutations, changed={changed}",
            lines.len()
        );
        PassOutcome {
            changed,
            lines: lines.len(),
            mutations,
        }
    }

    fn process_line(
        &self,
        surgery: &mut Surgery<'_>,
        index: usize,
        start: usize,
        ordinals: &HashMap<usize, usize>,
    ) {
        let line = surgery.doc.line_at(index, start);
        let kind = line.kind().unwrap_or(BlockKind::Paragraph);
        let active = self.read_only || surgery.selection.touches(line.start, line.end);

        if kind.is_marker_bearing() {
            let ordinal = ordinals.get(&index).copied().unwrap_or(1);
            if active {
                show_prefix(surgery, &line, kind, ordinal);
            } else {
                hide_prefix(surgery, &line, kind, ordinal, &self.options.glyphs);
            }
        } else {
            remove_markers(surgery, &line);
        }

        let line = surgery.doc.line_at(index, start);
        apply_inline(surgery, &line, kind, active);
        let ctx = LineContext {
            kind,
            depth: line.depth(),
            active,
        };
        style_line(surgery.doc, &line, ctx, self.options);
    }
}

fn with_newline(line: &Line) -> std::ops::Range<usize> {
    if line.has_newline {
        line.start..line.end + 1
    } else {
        line.span()
    }
}

/// Give untagged lines a kind, and demote lines whose text no longer fits
/// theirs. Offsets are unchanged.
fn assign_kinds(surgery: &mut Surgery<'_>) {
    for line in surgery.doc.lines() {
        let body = surgery.doc.slice_text(line.after_markers()..line.end);
        let explicit = line
            .kind()
            .filter(|k| *k != BlockKind::BlankLine || body.is_empty());
        let assigned = match explicit {
            Some(BlockKind::HorizontalRule)
                if !body.is_empty() && raw_prefix_len(BlockKind::HorizontalRule, &body).is_none() =>
            {
                Some((BlockKind::Paragraph, None))
            }
            Some(_) => None,
            None if body.is_empty() => None,
            None => Some(match infer_prefix(&body) {
                Some(found) => (found.kind, Some(found.depth)),
                None => (BlockKind::Paragraph, None),
            }),
        };
        if let Some((kind, depth)) = assigned {
            log::trace!("line {} assigned {kind:?}", line.index);
            surgery.retag(with_newline(&line), |tags| tags.set_block(kind, depth));
        }
    }
}

fn remove_markers(surgery: &mut Surgery<'_>, line: &Line) {
    for marker in line.list_markers.iter().rev() {
        surgery.remove(marker.clone());
    }
}

/// A line with a synthetic marker or a hidden prefix holds no raw prefix,
/// so its canonical prefix always goes back in.
fn show_prefix(surgery: &mut Surgery<'_>, line: &Line, kind: BlockKind, ordinal: usize) {
    let stripped = line.has_list_marker() || line.tags.prefix_hidden;
    if line.tags.prefix_hidden {
        surgery.retag(with_newline(line), |tags| tags.prefix_hidden = false);
    }
    remove_markers(surgery, line);
    let text = surgery.doc.line_at(line.index, line.start).text;
    if stripped || raw_prefix_len(kind, &text).is_none() {
        let prefix = canonical_prefix(kind, line.depth(), ordinal);
        let tags = RunTags {
            prefix_hidden: false,
            ..line.tags.clone()
        };
        surgery.insert(line.start, &prefix, tags);
    }
}

fn hide_prefix(
    surgery: &mut Surgery<'_>,
    line: &Line,
    kind: BlockKind,
    ordinal: usize,
    glyphs: &Glyphs,
) {
    let glyph = marker_glyph(kind, ordinal, glyphs);
    if line.has_list_marker() {
        let current = glyph.as_ref().is_some_and(|g| {
            line.list_markers.len() == 1
                && line.list_markers[0].start == line.start
                && surgery.doc.slice_text(line.list_markers[0].clone()) == *g
        });
        if current {
            return;
        }
        remove_markers(surgery, line);
    } else if line.tags.prefix_hidden {
        if glyph.is_none() {
            return;
        }
        surgery.retag(with_newline(line), |tags| tags.prefix_hidden = false);
    } else if let Some(len) = raw_prefix_len(kind, &line.text) {
        surgery.remove(line.start..line.start + len);
    }

    match glyph {
        Some(glyph) => {
            let tags = RunTags {
                is_list_marker: true,
                prefix_hidden: false,
                ..line.tags.clone()
            };
            surgery.insert(line.start, &glyph, tags);
        }
        None => {
            let stripped = surgery.doc.line_at(line.index, line.start);
            surgery.retag(with_newline(&stripped), |tags| tags.prefix_hidden = true);
        }
    }
}

fn marker_glyph(kind: BlockKind, ordinal: usize, glyphs: &Glyphs) -> Option<String> {
    match kind {
        BlockKind::BulletList => Some(glyphs.bullet.clone()),
        BlockKind::OrderedList => Some(format!("{ordinal}.")),
        BlockKind::TaskChecked => Some(glyphs.checked.clone()),
        BlockKind::TaskUnchecked => Some(glyphs.unchecked.clone()),
        BlockKind::Blockquote => Some(glyphs.quote.clone()),
        BlockKind::HorizontalRule => Some(glyphs.rule.clone()),
        BlockKind::Heading(_)
        | BlockKind::Paragraph
        | BlockKind::CodeBlock
        | BlockKind::ImageCaption
        | BlockKind::BlankLine
        | BlockKind::HtmlBlock
        | BlockKind::Gallery
        | BlockKind::TableRow => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CharInline {
    marker: bool,
    intents: InlineIntents,
    strikethrough: bool,
}

fn inline_layout(text: &str) -> Vec<CharInline> {
    let mut chars = vec![CharInline::default(); text.chars().count()];
    for span in find_inline_spans(text) {
        for i in span.open.clone().chain(span.close.clone()) {
            if let Some(c) = chars.get_mut(i) {
                c.marker = true;
            }
        }
        for i in span.content() {
            let Some(c) = chars.get_mut(i) else { continue };
            match span.style {
                InlineStyle::Code => c.intents.insert(InlineIntent::Code),
                InlineStyle::Strong => c.intents.insert(InlineIntent::StronglyEmphasized),
                InlineStyle::Emphasis => c.intents.insert(InlineIntent::Emphasized),
                InlineStyle::Strikethrough => c.strikethrough = true,
            }
        }
    }
    chars
}

/// Re-derive delimiter and intent tags from the line's text. Prefixes,
/// glyphs and lines that do not parse inline end up with none.
fn apply_inline(surgery: &mut Surgery<'_>, line: &Line, kind: BlockKind, shown: bool) {
    if line.span().is_empty() {
        return;
    }
    let content_start = kind.parses_inline().then(|| {
        let at = line.after_markers();
        let prefix = if shown && kind.is_marker_bearing() {
            raw_prefix_len(kind, &surgery.doc.slice_text(at..line.end)).unwrap_or(0)
        } else {
            0
        };
        at + prefix
    });
    let layout = content_start
        .map(|cs| inline_layout(&surgery.doc.slice_text(cs..line.end)))
        .unwrap_or_default();

    surgery.retag_per_char(line.span(), |offset, tags| {
        let found = content_start
            .and_then(|cs| offset.checked_sub(cs))
            .and_then(|rel| layout.get(rel))
            .copied()
            .unwrap_or_default();
        tags.is_inline_marker = found.marker;
        tags.inline = found.intents;
        tags.strikethrough = found.strikethrough;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Run;
    use crate::rendering::table::MonospaceMeasurer;
    use pretty_assertions::assert_eq;

    fn run_pass(doc: &mut Document, selection: &mut Selection) -> PassOutcome {
        let options = EngineOptions::default();
        let measurer = MonospaceMeasurer::new(options.char_advance);
        VisibilityPass {
            options: &options,
            measurer: &measurer,
            read_only: false,
        }
        .run(doc, selection)
    }

    #[test]
    fn inactive_bullet_swaps_prefix_for_glyph() {
        let mut doc = Document::plain("- abc\nhello world");
        let mut sel = Selection::caret(10);
        let outcome = run_pass(&mut doc, &mut sel);
        assert!(outcome.changed);
        assert_eq!(doc.text(), "•abc\nhello world");
        assert_eq!(sel, Selection::caret(9));
        assert_eq!(doc.lines()[0].kind(), Some(BlockKind::BulletList));
        assert_eq!(doc.lines()[1].kind(), Some(BlockKind::Paragraph));
    }

    #[test]
    fn active_line_shows_the_raw_prefix() {
        let mut doc = Document::plain("- abc\nhello");
        let mut sel = Selection::caret(10);
        run_pass(&mut doc, &mut sel);
        let mut sel = Selection::caret(2);
        run_pass(&mut doc, &mut sel);
        assert_eq!(doc.text(), "- abc\nhello");
        assert_eq!(sel, Selection::caret(3));
        assert!(doc.lines()[0].list_markers.is_empty());
    }

    #[test]
    fn headings_lose_their_hashes_without_a_glyph() {
        let mut doc = Document::plain("text\n## Title");
        let mut sel = Selection::caret(0);
        run_pass(&mut doc, &mut sel);
        assert_eq!(doc.text(), "text\nTitle");
        assert_eq!(doc.lines()[1].kind(), Some(BlockKind::Heading(2)));
    }

    #[test]
    fn ordered_glyphs_use_renumbered_ordinals() {
        let mut doc = Document::plain("7. a\n7. b\n7. c\n\nend");
        let mut sel = Selection::caret(doc.len());
        run_pass(&mut doc, &mut sel);
        assert_eq!(doc.text(), "1.a\n2.b\n3.c\n\nend");
    }

    #[test]
    fn second_pass_changes_nothing() {
        let mut doc = Document::plain("# T\n- [ ] task\n> quote **b**\n---\n1. one\ntext `code`");
        let mut sel = Selection::caret(0);
        run_pass(&mut doc, &mut sel);
        let snapshot = doc.clone();
        let outcome = run_pass(&mut doc, &mut sel);
        assert!(!outcome.changed);
        assert_eq!(outcome.mutations, 0);
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn delimiters_are_tagged_and_content_gets_its_intent() {
        let mut doc = Document::plain("a **b** c");
        let mut sel = Selection::caret(0);
        run_pass(&mut doc, &mut sel);
        assert_eq!(doc.text(), "a **b** c");
        assert!(doc.tags_at(2).is_some_and(|t| t.is_inline_marker));
        let content = doc.tags_at(4).cloned().unwrap_or_default();
        assert!(!content.is_inline_marker);
        assert!(content.inline.contains(InlineIntent::StronglyEmphasized));
        assert!(doc.tags_at(8).is_some_and(|t| t.inline.is_empty()));
    }

    #[test]
    fn code_lines_never_carry_inline_tags() {
        let code = RunTags::block(BlockKind::CodeBlock);
        let stale = RunTags {
            is_inline_marker: true,
            ..code.clone()
        };
        let mut doc = Document::from_runs(vec![Run::new("**", stale), Run::new("x**", code)]);
        let mut sel = Selection::caret(0);
        run_pass(&mut doc, &mut sel);
        assert_eq!(doc.text(), "**x**");
        assert_eq!(doc.runs().len(), 1);
        assert!(!doc.runs()[0].tags.is_inline_marker);
    }

    #[test]
    fn item_text_that_looks_like_a_prefix_survives_focus_changes() {
        let mut doc = Document::plain("- - x
end");
        let mut away = Selection::caret(doc.len());
        run_pass(&mut doc, &mut away);
        assert_eq!(doc.text(), "•- x
end");
        let mut on = Selection::caret(1);
        run_pass(&mut doc, &mut on);
        assert_eq!(doc.text(), "- - x
end");
        let mut away = Selection::caret(doc.len());
        run_pass(&mut doc, &mut away);
        run_pass(&mut doc, &mut away);
        assert_eq!(doc.text(), "•- x
end");
    }

    #[test]
    fn heading_text_that_looks_like_a_prefix_survives_focus_changes() {
        let heading = RunTags::block(BlockKind::Heading(1));
        let mut doc = Document::from_runs(vec![
            Run::new("# # foo\n", heading),
            Run::new("end", RunTags::block(BlockKind::Paragraph)),
        ]);
        let mut away = Selection::caret(doc.len());
        run_pass(&mut doc, &mut away);
        assert_eq!(doc.text(), "# foo\nend");
        assert!(doc.lines()[0].tags.prefix_hidden);

        let mut on = Selection::caret(0);
        run_pass(&mut doc, &mut on);
        assert_eq!(doc.text(), "# # foo\nend");
        assert!(!doc.lines()[0].tags.prefix_hidden);

        let mut away = Selection::caret(doc.len());
        run_pass(&mut doc, &mut away);
        let settled = doc.clone();
        let outcome = run_pass(&mut doc, &mut away);
        assert!(!outcome.changed);
        assert_eq!(doc, settled);
        assert_eq!(doc.text(), "# foo\nend");
        assert_eq!(doc.lines()[0].content_start(), 0);
    }

    #[test]
    fn rule_and_quote_glyphs() {
        let mut doc = Document::plain("> q\n---\nend");
        let mut sel = Selection::caret(doc.len());
        run_pass(&mut doc, &mut sel);
        assert_eq!(doc.text(), "┃q\n⎯⎯⎯\nend");
        let lines = doc.lines();
        assert_eq!(lines[1].kind(), Some(BlockKind::HorizontalRule));
        assert_eq!(lines[1].list_markers, vec![3..6]);
    }
}
