//! Rich document back to markdown text.
//!
//! Synthetic marker runs are skipped and a raw prefix left on the active line
//! is stripped, then every line is re-emitted with canonical syntax. Inline
//! delimiters are ordinary text and come out verbatim.

use crate::models::{BlockKind, ColumnAlignment, Document, ExportGroup, Line};

use super::patterns::{
    escape_heading_text, escape_paragraph_line, infer_prefix, raw_prefix_len, starts_list_item,
};

/// One line, reduced to what the serializer needs.
#[derive(Debug)]
struct ExportLine {
    kind: BlockKind,
    depth: u8,
    /// Line content with links and images already in markdown form.
    body: String,
    language: Option<String>,
    header: bool,
    alignments: Vec<ColumnAlignment>,
    /// A later paragraph of the list item at `depth`.
    nested: bool,
    hard_break: bool,
}

impl ExportLine {
    fn is_blank(&self) -> bool {
        self.body.is_empty() && matches!(self.kind, BlockKind::Paragraph | BlockKind::BlankLine)
    }

    /// Lines that join with a single newline share a key.
    fn group_key(&self) -> Option<(ExportGroup, Option<&str>)> {
        let group = self.kind.export_group()?;
        let language = match group {
            ExportGroup::Code => self.language.as_deref(),
            ExportGroup::List | ExportGroup::Quote | ExportGroup::Html | ExportGroup::Table => None,
        };
        Some((group, language))
    }
}

/// Serialize `doc`, re-prepending `frontmatter` byte for byte.
pub fn export_markdown(doc: &Document, frontmatter: Option<&str>) -> String {
    let lines: Vec<ExportLine> = doc.lines().iter().map(|l| export_line(doc, l)).collect();
    let body = join_lines(&lines);

    let mut out = String::new();
    if let Some(header) = frontmatter {
        out.push_str(header);
        if !body.is_empty() && !header.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(&body);
    out
}

fn export_line(doc: &Document, line: &Line) -> ExportLine {
    let content = line.content_text();
    let inferred = infer_prefix(&content);
    let mut kind = line
        .kind()
        .or(inferred.map(|p| p.kind))
        .unwrap_or(BlockKind::Paragraph);
    let depth = match line.kind() {
        Some(_) => line.depth(),
        None => inferred.map_or(1, |p| p.depth),
    };

    let strip = if line.has_list_marker() || line.tags.prefix_hidden {
        0
    } else {
        raw_prefix_len(kind, &content).unwrap_or(0)
    };

    let mut segments: Vec<(String, Option<String>)> = Vec::new();
    let mut skipped = 0usize;
    let mut alignments = vec![
        line.tags
            .table_cell
            .map(|c| c.alignment)
            .unwrap_or_default(),
    ];
    for (_, text, run) in doc.pieces(line.span()) {
        if run.tags.is_list_marker {
            continue;
        }
        let mut text = text;
        if skipped < strip {
            let take = (strip - skipped).min(text.chars().count());
            skipped += take;
            text = text.chars().skip(take).collect();
        }
        if text.is_empty() {
            continue;
        }
        if text.contains('\t') {
            let alignment = run.tags.table_cell.map(|c| c.alignment).unwrap_or_default();
            alignments.extend(std::iter::repeat_n(alignment, text.matches('\t').count()));
        }
        match segments.last_mut() {
            Some((last, link)) if *link == run.tags.link_target => last.push_str(&text),
            _ => segments.push((text, run.tags.link_target.clone())),
        }
    }

    if kind == BlockKind::BlankLine && segments.iter().any(|(t, _)| !t.is_empty()) {
        kind = BlockKind::Paragraph;
    }

    let images = matches!(kind, BlockKind::ImageCaption | BlockKind::Gallery);
    let body: String = segments
        .into_iter()
        .map(|(text, link)| match link {
            Some(target) if images => format!("![{text}]({target})"),
            Some(target) => format!("[{text}]({target})"),
            None => text,
        })
        .collect();

    ExportLine {
        kind,
        depth,
        body,
        language: line.tags.code_language.clone(),
        header: line.tags.table_cell.is_some_and(|c| c.header),
        alignments,
        nested: kind == BlockKind::Paragraph && line.tags.list_depth.is_some(),
        hard_break: line.tags.hard_break,
    }
}

fn join_lines(lines: &[ExportLine]) -> String {
    let mut out = String::new();
    // (depth, marker width) of the enclosing list items.
    let mut ancestors: Vec<(u8, usize)> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| &lines[p]);
        let next = lines.get(i + 1);

        if let Some(prev) = prev {
            if continues_after_hard_break(prev, line) {
                out.push_str("  \n");
            } else {
                out.push_str(separator(prev, line));
            }
        }

        if !line.kind.is_list() && !line.nested {
            ancestors.clear();
        }
        let opens_group = prev.is_none_or(|p| !joins(p, line));
        let closes_group = next.is_none_or(|n| !joins(line, n));

        match line.kind {
            BlockKind::Paragraph | BlockKind::ImageCaption | BlockKind::Gallery => {
                if line.nested {
                    while ancestors.last().is_some_and(|(d, _)| *d > line.depth) {
                        ancestors.pop();
                    }
                    let indent: usize = ancestors.iter().map(|(_, w)| w).sum();
                    out.push_str(&" ".repeat(indent));
                }
                out.push_str(&escape_paragraph_line(&line.body));
            }
            BlockKind::BlankLine => {}
            BlockKind::Heading(level) => {
                out.push_str(&"#".repeat(usize::from(level)));
                out.push(' ');
                out.push_str(&escape_heading_text(line.body.trim_start()));
            }
            BlockKind::BulletList
            | BlockKind::OrderedList
            | BlockKind::TaskChecked
            | BlockKind::TaskUnchecked => {
                while ancestors.last().is_some_and(|(d, _)| *d >= line.depth) {
                    ancestors.pop();
                }
                let indent: usize = ancestors.iter().map(|(_, w)| w).sum();
                let marker = match line.kind {
                    BlockKind::OrderedList => "1. ",
                    BlockKind::TaskChecked => "- [x] ",
                    BlockKind::TaskUnchecked => "- [ ] ",
                    _ => "- ",
                };
                out.push_str(&" ".repeat(indent));
                out.push_str(marker);
                out.push_str(&escape_paragraph_line(&line.body));
                let width = if line.kind == BlockKind::OrderedList { 3 } else { 2 };
                ancestors.push((line.depth, width));
            }
            BlockKind::Blockquote => {
                // Quoted list items reimport as the same quote line.
                let body = if starts_list_item(&line.body) {
                    line.body.clone()
                } else {
                    escape_paragraph_line(&line.body)
                };
                if body.is_empty() {
                    out.push('>');
                } else {
                    out.push_str("> ");
                    out.push_str(&body);
                }
            }
            BlockKind::CodeBlock => {
                let fence = code_fence(lines, i);
                if opens_group {
                    out.push_str(fence);
                    out.push_str(line.language.as_deref().unwrap_or_default());
                    out.push('\n');
                }
                out.push_str(&line.body);
                if closes_group {
                    out.push('\n');
                    out.push_str(fence);
                }
            }
            BlockKind::HorizontalRule => out.push_str("---"),
            BlockKind::HtmlBlock => out.push_str(&line.body),
            BlockKind::TableRow => {
                out.push_str(&table_row(&line.body));
                if opens_group {
                    out.push('\n');
                    out.push_str(&delimiter_row(line));
                }
            }
        }
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn joins(a: &ExportLine, b: &ExportLine) -> bool {
    if a.is_blank() || b.is_blank() {
        return false;
    }
    if b.kind == BlockKind::TableRow && b.header {
        return false;
    }
    a.group_key().is_some() && a.group_key() == b.group_key()
}

fn continues_after_hard_break(prev: &ExportLine, line: &ExportLine) -> bool {
    line.hard_break && prev.kind == line.kind && !prev.is_blank() && !line.is_blank()
}

fn separator(prev: &ExportLine, next: &ExportLine) -> &'static str {
    if prev.is_blank() {
        "\n"
    } else if next.is_blank() {
        "\n\n"
    } else if joins(prev, next) {
        "\n"
    } else {
        "\n\n"
    }
}

/// Backticks, unless a line of the block would close them early.
fn code_fence(lines: &[ExportLine], at: usize) -> &'static str {
    let mut start = at;
    while start > 0 && joins(&lines[start - 1], &lines[start]) {
        start -= 1;
    }
    let mut end = at;
    while end + 1 < lines.len() && joins(&lines[end], &lines[end + 1]) {
        end += 1;
    }
    if lines[start..=end]
        .iter()
        .any(|l| l.body.trim_start().starts_with("```"))
    {
        "~~~"
    } else {
        "```"
    }
}

fn table_row(body: &str) -> String {
    let cells: Vec<String> = body.split('\t').map(|c| escape_pipes(c.trim())).collect();
    format!("| {} |", cells.join(" | "))
}

fn delimiter_row(header: &ExportLine) -> String {
    let columns = header.body.split('\t').count();
    let cells: Vec<&str> = (0..columns)
        .map(|i| match header.alignments.get(i).copied().unwrap_or_default() {
            ColumnAlignment::Left => "---",
            ColumnAlignment::Center => ":-:",
            ColumnAlignment::Right => "--:",
        })
        .collect();
    format!("| {} |", cells.join(" | "))
}

fn escape_pipes(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut prev = None;
    for c in cell.chars() {
        if c == '|' && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
