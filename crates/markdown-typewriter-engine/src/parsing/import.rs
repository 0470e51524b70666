//! Markdown text into the run-based document.
//!
//! Every line of the result carries an explicit kind. Marker-bearing lines
//! get their canonical raw prefix as literal text (`## `, `- [ ] `...), so the
//! first visibility pass decides per line whether to keep it or swap in a
//! synthetic marker. Inline text comes from the source slices, so emphasis
//! delimiters, escapes and entities stay exactly as written.

use std::ops::Range;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use super::frontmatter::split_frontmatter;
use super::patterns::canonical_prefix;
use crate::models::{
    BlockKind, ColumnAlignment, Document, InlineIntent, Run, RunTags, TableCell,
};

/// Result of importing a markdown file.
#[derive(Debug, Clone, PartialEq)]
pub struct Imported {
    pub document: Document,
    pub frontmatter: Option<String>,
}

/// Parse `text` into a document plus its opaque header block.
///
/// Anything pulldown-cmark reports that has no line kind of its own ends up
/// as paragraph text; nothing here fails.
pub fn import_markdown(text: &str) -> Imported {
    let (frontmatter, body) = split_frontmatter(text);
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut processor = MarkdownProcessor::new(body);
    for (event, range) in Parser::new_ext(body, options).into_offset_iter() {
        processor.process_event(event, range);
    }
    let document = processor.finalize();
    log::debug!(
        "imported {} chars into {} runs (frontmatter: {})",
        body.len(),
        document.runs().len(),
        frontmatter.is_some()
    );
    Imported {
        document,
        frontmatter: frontmatter.map(str::to_string),
    }
}

/// One element of pulldown-cmark's start/end nesting.
///
/// Every `Start` pushes exactly one frame and every `End` pops one, so the
/// `TagEnd` payload never has to be inspected.
#[derive(Debug)]
enum Frame {
    List { ordered: bool, id: u32, next: u64 },
    /// `paragraphs` counts the item's paragraphs seen so far.
    Item { paragraphs: usize },
    Quote,
    Heading,
    Paragraph { images: Vec<(String, String)>, has_text: bool },
    Code { language: Option<String>, buffer: String },
    Html { buffer: String },
    Table { alignments: Vec<ColumnAlignment> },
    TableRow { header: bool, cell: usize },
    Cell(TableCell),
    Inline { delimiter: String, intent: Option<InlineIntent> },
    Link { target: String },
    Image { target: String, alt: String },
    Other,
}

#[derive(Debug)]
struct LineBuild {
    tags: RunTags,
    ordinal: usize,
    /// Text pieces with their inline tags; line tags are merged at flush.
    pieces: Vec<(String, RunTags)>,
}

impl LineBuild {
    fn new(tags: RunTags) -> Self {
        Self {
            tags,
            ordinal: 0,
            pieces: Vec::new(),
        }
    }
}

/// Drives pulldown-cmark events into lines.
///
/// List items become one line each, nested lists included: nested list
/// events arrive inside their parent item, after the parent's own text, so
/// starting a nested list closes the parent's line. Blockquote paragraphs
/// and every soft break inside a quote start a new quote line.
struct MarkdownProcessor<'a> {
    source: &'a str,
    stack: Vec<Frame>,
    lines: Vec<LineBuild>,
    current: Option<LineBuild>,
    next_list_id: u32,
    /// Offset just past the last non-blank byte of the previous top-level block.
    last_block_end: Option<usize>,
}

impl<'a> MarkdownProcessor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            stack: Vec::new(),
            lines: Vec::new(),
            current: None,
            next_list_id: 0,
            last_block_end: None,
        }
    }

    fn process_event(&mut self, event: Event<'_>, range: Range<usize>) {
        let top_level = self.stack.is_empty();
        if top_level && matches!(event, Event::Start(_) | Event::Rule | Event::Html(_)) {
            self.note_top_level_block(&range);
        }

        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text, range),
            Event::Code(_) => self.inline_code(range),
            Event::Html(text) | Event::InlineHtml(text) => {
                if let Some(Frame::Html { buffer }) = self.stack.last_mut() {
                    buffer.push_str(&text);
                } else {
                    self.push_literal(&text);
                }
            }
            Event::SoftBreak => {
                if self.in_quote_context() {
                    self.flush_line();
                    self.begin_line(self.context_tags());
                } else {
                    self.push_literal(" ");
                }
            }
            Event::HardBreak => {
                if self.in_item() {
                    self.push_literal(" ");
                } else if let Some(line) = self.current.as_ref() {
                    let tags = RunTags {
                        hard_break: true,
                        ..line.tags.line_tags()
                    };
                    self.flush_line();
                    self.begin_line(tags);
                }
            }
            Event::Rule => {
                self.flush_line();
                self.begin_line(RunTags::block(BlockKind::HorizontalRule));
                self.flush_line();
            }
            Event::TaskListMarker(checked) => {
                if self.current_kind() == Some(BlockKind::Blockquote) {
                    self.push_literal(if checked { "[x] " } else { "[ ] " });
                } else if let Some(line) = self.current.as_mut() {
                    let kind = if checked {
                        BlockKind::TaskChecked
                    } else {
                        BlockKind::TaskUnchecked
                    };
                    let depth = line.tags.list_depth;
                    line.tags.set_block(kind, depth);
                }
            }
            _ => {
                let source = self.source;
                self.push_literal(source.get(range).unwrap_or_default());
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let frame = match tag {
            Tag::Paragraph => {
                if self.in_item() {
                    if self.count_item_paragraph() > 0 {
                        self.begin_line(self.item_continuation_tags());
                    } else {
                        self.ensure_line();
                    }
                } else {
                    self.flush_line();
                    self.begin_line(self.context_tags());
                }
                Frame::Paragraph {
                    images: Vec::new(),
                    has_text: false,
                }
            }
            Tag::Heading { level, .. } => {
                if self.in_item() {
                    self.ensure_line();
                } else {
                    self.flush_line();
                    self.begin_line(RunTags::block(BlockKind::heading(heading_level(level))));
                }
                Frame::Heading
            }
            Tag::List(start) => {
                self.flush_line();
                let id = self.next_list_id;
                self.next_list_id += 1;
                Frame::List {
                    ordered: start.is_some(),
                    id,
                    next: start.unwrap_or(1),
                }
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.list_depth();
                let mut ordinal = 0;
                let mut ordered_item = false;
                let mut tags = RunTags::default();
                if let Some(Frame::List { ordered, id, next }) = self.innermost_list_mut() {
                    let kind = if *ordered {
                        BlockKind::OrderedList
                    } else {
                        BlockKind::BulletList
                    };
                    tags = RunTags::list(kind, depth, Some(*id));
                    ordinal = usize::try_from(*next).unwrap_or(1);
                    ordered_item = *ordered;
                    *next += 1;
                }
                if self.in_quote() {
                    // Lists inside a quote flatten to quote lines that keep
                    // the item marker as text.
                    self.begin_line(RunTags::block(BlockKind::Blockquote));
                    let marker = if ordered_item {
                        format!("{ordinal}. ")
                    } else {
                        "- ".to_string()
                    };
                    self.push_literal(&marker);
                } else {
                    self.begin_line(tags);
                    if let Some(line) = self.current.as_mut() {
                        line.ordinal = ordinal;
                    }
                }
                Frame::Item { paragraphs: 0 }
            }
            Tag::BlockQuote(_) => {
                self.flush_line();
                Frame::Quote
            }
            Tag::CodeBlock(kind) => {
                self.flush_line();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let info = info.trim();
                        (!info.is_empty()).then(|| info.to_string())
                    }
                    CodeBlockKind::Indented => None,
                };
                Frame::Code {
                    language,
                    buffer: String::new(),
                }
            }
            Tag::HtmlBlock => {
                self.flush_line();
                Frame::Html {
                    buffer: String::new(),
                }
            }
            Tag::Table(alignments) => {
                self.flush_line();
                Frame::Table {
                    alignments: alignments.into_iter().map(column_alignment).collect(),
                }
            }
            Tag::TableHead => self.open_table_row(true),
            Tag::TableRow => self.open_table_row(false),
            Tag::TableCell => self.open_table_cell(),
            Tag::Emphasis => self.open_inline(range, 1, Some(InlineIntent::Emphasized)),
            Tag::Strong => self.open_inline(range, 2, Some(InlineIntent::StronglyEmphasized)),
            Tag::Strikethrough => {
                let tildes = self
                    .source
                    .get(range.clone())
                    .map_or(2, |s| s.chars().take_while(|c| *c == '~').count());
                self.open_inline(range, tildes.max(1), None)
            }
            Tag::Link { dest_url, .. } => Frame::Link {
                target: dest_url.to_string(),
            },
            Tag::Image { dest_url, .. } => Frame::Image {
                target: dest_url.to_string(),
                alt: String::new(),
            },
            _ => Frame::Other,
        };
        self.stack.push(frame);
    }

    fn open_table_row(&mut self, header: bool) -> Frame {
        self.flush_line();
        let mut tags = RunTags::block(BlockKind::TableRow);
        tags.table_cell = Some(TableCell {
            header,
            alignment: self.column(0),
        });
        self.begin_line(tags);
        Frame::TableRow { header, cell: 0 }
    }

    /// Cells after the first are preceded by a `\t` separator run tagged
    /// with the cell's own alignment.
    fn open_table_cell(&mut self) -> Frame {
        let mut header = false;
        let mut index = 0;
        if let Some(Frame::TableRow { header: h, cell }) = self
            .stack
            .iter_mut()
            .rev()
            .find(|f| matches!(f, Frame::TableRow { .. }))
        {
            header = *h;
            index = *cell;
            *cell += 1;
        }
        let cell = TableCell {
            header,
            alignment: self.column(index),
        };
        if index > 0 {
            let tags = RunTags {
                table_cell: Some(cell),
                ..RunTags::default()
            };
            self.push_piece("\t".to_string(), tags);
        }
        Frame::Cell(cell)
    }

    /// The opening delimiter is copied from the source; the same text closes.
    fn open_inline(
        &mut self,
        range: Range<usize>,
        width: usize,
        intent: Option<InlineIntent>,
    ) -> Frame {
        let delimiter = self
            .source
            .get(range.start..range.start + width)
            .unwrap_or_default()
            .to_string();
        let mut tags = self.inline_tags();
        tags.is_inline_marker = true;
        self.push_piece(delimiter.clone(), tags);
        Frame::Inline { delimiter, intent }
    }

    fn end(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Paragraph { images, has_text } => {
                if !has_text && !images.is_empty() && self.context_kind() == BlockKind::Paragraph
                {
                    self.image_line(images);
                }
                if !self.in_item() {
                    self.flush_line();
                }
            }
            Frame::Heading => {
                if !self.in_item() {
                    self.flush_line();
                }
            }
            Frame::Item { .. } | Frame::TableRow { .. } => self.flush_line(),
            Frame::Code { language, buffer } => {
                let body = buffer.strip_suffix('\n').unwrap_or(&buffer);
                let mut tags = RunTags::block(BlockKind::CodeBlock);
                tags.code_language = language;
                for line in body.split('\n') {
                    self.begin_line(tags.clone());
                    self.push_piece_raw(line);
                    self.flush_line();
                }
            }
            Frame::Html { buffer } => {
                let body = buffer.strip_suffix('\n').unwrap_or(&buffer);
                for line in body.split('\n') {
                    self.begin_line(RunTags::block(BlockKind::HtmlBlock));
                    self.push_piece_raw(line);
                    self.flush_line();
                }
            }
            Frame::Inline { delimiter, .. } => {
                let mut tags = self.inline_tags();
                tags.is_inline_marker = true;
                self.push_piece(delimiter, tags);
            }
            Frame::Image { target, alt } => {
                let literal = format!("![{alt}]({target})");
                if let Some(Frame::Paragraph { images, .. }) = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find(|f| matches!(f, Frame::Paragraph { .. }))
                {
                    images.push((alt, target));
                }
                let tags = self.inline_tags();
                self.push_piece(literal, tags);
            }
            Frame::List { .. }
            | Frame::Quote
            | Frame::Table { .. }
            | Frame::Cell(_)
            | Frame::Link { .. }
            | Frame::Other => {}
        }
    }

    fn text(&mut self, text: &str, range: Range<usize>) {
        match self.stack.last_mut() {
            Some(Frame::Code { buffer, .. }) | Some(Frame::Html { buffer }) => {
                buffer.push_str(text);
                return;
            }
            _ => {}
        }
        if let Some(Frame::Image { alt, .. }) = self
            .stack
            .iter_mut()
            .rev()
            .find(|f| matches!(f, Frame::Image { .. }))
        {
            alt.push_str(text);
            return;
        }
        let source = self.source;
        let literal = source
            .get(range)
            .filter(|s| !s.contains('\n'))
            .unwrap_or(text)
            .to_string();
        if !literal.trim().is_empty() {
            self.mark_paragraph_text();
        }
        let tags = self.inline_tags();
        self.push_piece(literal, tags);
    }

    /// Inline code keeps its source backticks as delimiter runs.
    fn inline_code(&mut self, range: Range<usize>) {
        let source = self.source;
        let raw = source.get(range).unwrap_or_default();
        let ticks = raw.chars().take_while(|c| *c == '`').count();
        let trailing = raw.chars().rev().take_while(|c| *c == '`').count();
        if ticks == 0 || ticks + trailing > raw.len() {
            self.push_literal(raw);
            return;
        }
        self.mark_paragraph_text();
        let mut marker = self.inline_tags();
        marker.is_inline_marker = true;
        let mut content = self.inline_tags();
        content.inline.insert(InlineIntent::Code);
        self.push_piece(raw[..ticks].to_string(), marker.clone());
        self.push_piece(raw[ticks..raw.len() - trailing].to_string(), content);
        self.push_piece(raw[raw.len() - trailing..].to_string(), marker);
    }

    fn push_literal(&mut self, text: &str) {
        if !text.trim().is_empty() {
            self.mark_paragraph_text();
        }
        let tags = self.inline_tags();
        self.push_piece(text.to_string(), tags);
    }

    fn push_piece(&mut self, text: String, tags: RunTags) {
        if text.is_empty() {
            return;
        }
        self.ensure_line();
        if let Some(line) = self.current.as_mut() {
            line.pieces.push((text, tags));
        }
    }

    fn push_piece_raw(&mut self, text: &str) {
        self.push_piece(text.to_string(), RunTags::default());
    }

    fn mark_paragraph_text(&mut self) {
        if let Some(Frame::Paragraph { has_text, .. }) = self
            .stack
            .iter_mut()
            .rev()
            .find(|f| matches!(f, Frame::Paragraph { .. }))
        {
            *has_text = true;
        }
    }

    /// Replace the current paragraph line with an image caption or gallery.
    fn image_line(&mut self, images: Vec<(String, String)>) {
        let Some(line) = self.current.as_mut() else {
            return;
        };
        let kind = if images.len() == 1 {
            BlockKind::ImageCaption
        } else {
            BlockKind::Gallery
        };
        line.tags.set_block(kind, None);
        line.pieces.clear();
        for (i, (alt, target)) in images.into_iter().enumerate() {
            if i > 0 {
                line.pieces.push((" ".to_string(), RunTags::default()));
            }
            let text = if alt.is_empty() { target.clone() } else { alt };
            let tags = RunTags {
                link_target: Some(target),
                ..RunTags::default()
            };
            line.pieces.push((text, tags));
        }
    }

    fn begin_line(&mut self, tags: RunTags) {
        self.flush_line();
        self.current = Some(LineBuild::new(tags));
    }

    fn ensure_line(&mut self) {
        if self.current.is_none() {
            self.begin_line(self.context_tags());
        }
    }

    fn flush_line(&mut self) {
        if let Some(line) = self.current.take() {
            self.lines.push(line);
        }
    }

    /// Extra blank lines ahead of a top-level block become blank-line lines.
    ///
    /// One blank line between blocks is the normal separator; every blank
    /// line before the first block counts.
    fn note_top_level_block(&mut self, range: &Range<usize>) {
        let gap_start = self.last_block_end.unwrap_or(0);
        let gap = self.source.get(gap_start..range.start).unwrap_or_default();
        let newlines = gap.matches('\n').count();
        let blanks = match self.last_block_end {
            Some(_) => newlines.saturating_sub(2),
            None => newlines,
        };
        self.flush_line();
        for _ in 0..blanks {
            self.lines
                .push(LineBuild::new(RunTags::block(BlockKind::BlankLine)));
        }
        let block = self.source.get(range.clone()).unwrap_or_default();
        self.last_block_end = Some(range.start + block.trim_end().len());
    }

    fn innermost_list_mut(&mut self) -> Option<&mut Frame> {
        self.stack
            .iter_mut()
            .rev()
            .find(|f| matches!(f, Frame::List { .. }))
    }

    fn list_depth(&self) -> u8 {
        let lists = self
            .stack
            .iter()
            .filter(|f| matches!(f, Frame::List { .. }))
            .count();
        lists.clamp(1, 6) as u8
    }

    fn in_item(&self) -> bool {
        self.stack.iter().any(|f| matches!(f, Frame::Item { .. }))
    }

    fn in_quote(&self) -> bool {
        self.stack.iter().any(|f| matches!(f, Frame::Quote))
    }

    fn current_kind(&self) -> Option<BlockKind> {
        self.current.as_ref().and_then(|l| l.tags.block_kind)
    }

    /// Count a paragraph of the innermost item; returns how many came before.
    fn count_item_paragraph(&mut self) -> usize {
        match self
            .stack
            .iter_mut()
            .rev()
            .find(|f| matches!(f, Frame::Item { .. }))
        {
            Some(Frame::Item { paragraphs }) => {
                *paragraphs += 1;
                *paragraphs - 1
            }
            _ => 0,
        }
    }

    /// A later paragraph of a list item: a paragraph line nested at the
    /// item's depth, or another quote line inside a quote.
    fn item_continuation_tags(&self) -> RunTags {
        if self.in_quote() {
            return RunTags::block(BlockKind::Blockquote);
        }
        RunTags {
            list_depth: Some(self.list_depth()),
            ..RunTags::block(BlockKind::Paragraph)
        }
    }

    fn in_quote_context(&self) -> bool {
        self.context_kind() == BlockKind::Blockquote
    }

    /// Kind of a fresh line opened at the current nesting.
    fn context_kind(&self) -> BlockKind {
        for frame in self.stack.iter().rev() {
            match frame {
                Frame::Item { .. } => {
                    return self
                        .current
                        .as_ref()
                        .and_then(|l| l.tags.block_kind)
                        .unwrap_or(BlockKind::BulletList);
                }
                Frame::Quote => return BlockKind::Blockquote,
                _ => {}
            }
        }
        BlockKind::Paragraph
    }

    fn context_tags(&self) -> RunTags {
        match self.context_kind() {
            BlockKind::Blockquote => RunTags::block(BlockKind::Blockquote),
            kind if kind.is_list() => self
                .current
                .as_ref()
                .map(|l| l.tags.line_tags())
                .unwrap_or_else(|| RunTags::list(kind, self.list_depth(), None)),
            _ => RunTags::block(BlockKind::Paragraph),
        }
    }

    fn column(&self, index: usize) -> ColumnAlignment {
        self.stack
            .iter()
            .rev()
            .find_map(|f| match f {
                Frame::Table { alignments } => alignments.get(index).copied(),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Inline tags implied by the open emphasis, link and cell frames.
    fn inline_tags(&self) -> RunTags {
        let mut tags = RunTags::default();
        for frame in &self.stack {
            match frame {
                Frame::Inline {
                    intent: Some(intent),
                    ..
                } => tags.inline.insert(*intent),
                Frame::Inline { intent: None, .. } => tags.strikethrough = true,
                Frame::Link { target } => tags.link_target = Some(target.clone()),
                Frame::Cell(cell) => tags.table_cell = Some(*cell),
                _ => {}
            }
        }
        tags
    }

    fn finalize(mut self) -> Document {
        self.flush_line();
        let trailing = self
            .last_block_end
            .and_then(|end| self.source.get(end..))
            .map_or(0, |rest| rest.matches('\n').count().saturating_sub(2));
        for _ in 0..trailing {
            self.lines
                .push(LineBuild::new(RunTags::block(BlockKind::BlankLine)));
        }

        let count = self.lines.len();
        let mut runs = Vec::new();
        for (i, line) in self.lines.into_iter().enumerate() {
            let line_tags = line.tags.line_tags();
            if let Some(kind) = line.tags.block_kind.filter(|k| k.is_marker_bearing()) {
                let prefix = canonical_prefix(kind, line.tags.list_depth.unwrap_or(1), line.ordinal.max(1));
                runs.push(Run::new(prefix, line_tags.clone()));
            }
            for (text, inline) in line.pieces {
                runs.push(Run::new(text, merge_tags(&line_tags, inline)));
            }
            if i + 1 < count {
                runs.push(Run::new("\n", line_tags));
            }
        }
        Document::from_runs(runs)
    }
}

fn merge_tags(line: &RunTags, inline: RunTags) -> RunTags {
    RunTags {
        inline: inline.inline,
        strikethrough: inline.strikethrough,
        link_target: inline.link_target,
        is_inline_marker: inline.is_inline_marker,
        table_cell: inline.table_cell.or(line.table_cell),
        ..line.clone()
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn column_alignment(alignment: Alignment) -> ColumnAlignment {
    match alignment {
        Alignment::None | Alignment::Left => ColumnAlignment::Left,
        Alignment::Center => ColumnAlignment::Center,
        Alignment::Right => ColumnAlignment::Right,
    }
}
