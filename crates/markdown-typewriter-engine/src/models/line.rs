use std::ops::Range;

use super::block_kind::BlockKind;
use super::document::Document;
use super::tags::RunTags;
use crate::parsing::patterns::raw_prefix_len;

/// A line of the document, recomputed on every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub index: usize,
    /// Char offset of the first char.
    pub start: usize,
    /// Offset of the terminating `\n`, or the document end for the last line.
    pub end: usize,
    pub has_newline: bool,
    /// Raw text including marker runs, without the `\n`.
    pub text: String,
    /// Line-level tags taken from the first run that names a kind, falling
    /// back to the tags of the terminating newline.
    pub tags: RunTags,
    /// Absolute spans of synthetic marker runs on this line.
    pub list_markers: Vec<Range<usize>>,
}

impl Line {
    /// The explicit kind, if any run on the line carries one.
    pub fn kind(&self) -> Option<BlockKind> {
        self.tags.block_kind
    }

    pub fn depth(&self) -> u8 {
        self.tags.list_depth.unwrap_or(1)
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Whether a caret at `offset` sits on this line (end inclusive).
    pub fn touches(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }

    /// Whether `range` overlaps this line, end inclusive so a range ending
    /// exactly at the line start still counts.
    pub fn touches_range(&self, range: &Range<usize>) -> bool {
        range.start <= self.end && range.end >= self.start
    }

    pub fn has_list_marker(&self) -> bool {
        !self.list_markers.is_empty()
    }

    /// Text with synthetic marker runs taken out.
    pub fn content_text(&self) -> String {
        self.text
            .chars()
            .enumerate()
            .filter(|(i, _)| {
                let offset = self.start + i;
                !self.list_markers.iter().any(|m| m.contains(&offset))
            })
            .map(|(_, c)| c)
            .collect()
    }

    /// Where inline content begins: after the synthetic markers, at the
    /// line start when the prefix is hidden, or after the raw prefix of a
    /// marker-bearing kind.
    pub fn content_start(&self) -> usize {
        if self.has_list_marker() {
            return self.after_markers();
        }
        if self.tags.prefix_hidden {
            return self.start;
        }
        self.kind()
            .filter(|k| k.is_marker_bearing())
            .and_then(|k| raw_prefix_len(k, &self.text))
            .map_or(self.start, |len| self.start + len)
    }

    /// Offset right after the leading synthetic markers.
    pub fn after_markers(&self) -> usize {
        let mut at = self.start;
        for marker in &self.list_markers {
            if marker.start == at {
                at = marker.end;
            }
        }
        at
    }
}

/// Accumulates one line's text, tags and marker spans char by char.
struct LineScan {
    index: usize,
    start: usize,
    text: String,
    tags: Option<RunTags>,
    markers: Vec<Range<usize>>,
}

impl LineScan {
    fn new(index: usize, start: usize) -> Self {
        Self {
            index,
            start,
            text: String::new(),
            tags: None,
            markers: Vec::new(),
        }
    }

    fn push(&mut self, pos: usize, ch: char, tags: &RunTags) {
        self.text.push(ch);
        if self.tags.is_none() && tags.block_kind.is_some() {
            self.tags = Some(tags.line_tags());
        }
        if tags.is_list_marker {
            match self.markers.last_mut() {
                Some(last) if last.end == pos => last.end = pos + 1,
                _ => self.markers.push(pos..pos + 1),
            }
        }
    }

    /// `newline` carries the tags of the terminating `\n`, if there is one.
    fn finish(self, end: usize, newline: Option<&RunTags>) -> Line {
        let tags = self
            .tags
            .or_else(|| newline.map(RunTags::line_tags))
            .unwrap_or_default();
        Line {
            index: self.index,
            start: self.start,
            end,
            has_newline: newline.is_some(),
            text: self.text,
            tags,
            list_markers: self.markers,
        }
    }
}

pub(crate) fn derive_lines(doc: &Document) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut pos = 0usize;
    let mut scan = LineScan::new(0, 0);

    for run in doc.runs() {
        for ch in run.text().chars() {
            if ch == '\n' {
                let next = LineScan::new(lines.len() + 1, pos + 1);
                lines.push(std::mem::replace(&mut scan, next).finish(pos, Some(&run.tags)));
            } else {
                scan.push(pos, ch, &run.tags);
            }
            pos += 1;
        }
    }
    lines.push(scan.finish(pos, None));
    lines
}

/// The line starting at `start`, without scanning the lines before it.
/// `start` must be a line start.
pub(crate) fn line_at(doc: &Document, index: usize, start: usize) -> Line {
    let mut pos = 0usize;
    let mut scan = LineScan::new(index, start);
    for run in doc.runs() {
        let len = run.char_len();
        if pos + len <= start {
            pos += len;
            continue;
        }
        for ch in run.text().chars() {
            if pos < start {
                pos += 1;
                continue;
            }
            if ch == '\n' {
                return scan.finish(pos, Some(&run.tags));
            }
            scan.push(pos, ch, &run.tags);
            pos += 1;
        }
    }
    scan.finish(pos.max(start), None)
}
