use std::ops::Range;

use thiserror::Error;

use super::line::{Line, derive_lines, line_at};
use super::style::{ParagraphStyle, RunStyle};
use super::tags::RunTags;
use super::text::{char_len, char_to_byte};

/// Failures of document surgery. The engine absorbs these (logs and skips the
/// step); they never cross the public editor API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("offset {offset} is past the end of the document (len {len})")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("range {start}..{end} is inverted")]
    InvertedRange { start: usize, end: usize },
}

/// A slice of text with its tags and derived style.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    text: String,
    pub tags: RunTags,
    pub style: RunStyle,
    pub paragraph: ParagraphStyle,
}

impl Run {
    pub fn new(text: impl Into<String>, tags: RunTags) -> Self {
        Self {
            text: text.into(),
            tags,
            style: RunStyle::default(),
            paragraph: ParagraphStyle::default(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }

    fn same_attributes(&self, other: &Run) -> bool {
        self.tags == other.tags && self.style == other.style && self.paragraph == other.paragraph
    }
}

/// The rich document: an ordered sequence of runs.
///
/// Offsets everywhere are char offsets into the flattened text. Runs are kept
/// normalized: no empty runs, and no two neighbours with identical attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    runs: Vec<Run>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runs(runs: Vec<Run>) -> Self {
        let mut doc = Self { runs };
        doc.normalize();
        doc
    }

    /// Untagged text, as a host would paste it. Kinds get inferred.
    pub fn plain(text: &str) -> Self {
        Self::from_runs(vec![Run::new(text, RunTags::default())])
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(Run::char_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Flattened text of a char range (clamped).
    pub fn slice_text(&self, range: Range<usize>) -> String {
        self.pieces(range)
            .into_iter()
            .map(|(_, piece, _)| piece)
            .collect()
    }

    /// Tags of the char at `offset`.
    pub fn tags_at(&self, offset: usize) -> Option<&RunTags> {
        let mut pos = 0;
        for run in &self.runs {
            let len = run.char_len();
            if offset < pos + len {
                return Some(&run.tags);
            }
            pos += len;
        }
        None
    }

    /// Run pieces overlapping `range`: `(absolute range, text, run)`.
    pub fn pieces(&self, range: Range<usize>) -> Vec<(Range<usize>, String, &Run)> {
        let mut out = Vec::new();
        let mut pos = 0;
        for run in &self.runs {
            let len = run.char_len();
            let run_range = pos..pos + len;
            pos += len;
            let start = run_range.start.max(range.start);
            let end = run_range.end.min(range.end);
            if start >= end {
                if run_range.start >= range.end {
                    break;
                }
                continue;
            }
            let b0 = char_to_byte(&run.text, start - run_range.start);
            let b1 = char_to_byte(&run.text, end - run_range.start);
            out.push((start..end, run.text[b0..b1].to_string(), run));
        }
        out
    }

    pub fn lines(&self) -> Vec<Line> {
        derive_lines(self)
    }

    /// Re-read one line after edits that only touched it or what follows.
    pub fn line_at(&self, index: usize, start: usize) -> Line {
        line_at(self, index, start)
    }

    pub fn insert(&mut self, at: usize, text: &str, tags: RunTags) -> Result<(), EditError> {
        self.check_offset(at)?;
        if text.is_empty() {
            return Ok(());
        }
        let idx = self.split_at(at);
        let mut run = Run::new(text, tags);
        if let Some(prev) = idx.checked_sub(1).and_then(|i| self.runs.get(i)) {
            run.style = prev.style.clone();
            run.paragraph = prev.paragraph.clone();
        }
        self.runs.insert(idx, run);
        self.normalize();
        Ok(())
    }

    pub fn remove(&mut self, range: Range<usize>) -> Result<(), EditError> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }
        let runs = self.split_range(&range);
        self.runs.drain(runs);
        self.normalize();
        Ok(())
    }

    /// Replace `range` with `text`, the way a host applies a keystroke:
    /// inserted text takes the typing attributes of the char before it. At a
    /// line start it takes those of the line it lands on instead.
    pub fn replace_typed(&mut self, range: Range<usize>, text: &str) -> Result<(), EditError> {
        self.check_range(&range)?;
        let at_line_start =
            range.start == 0 || self.slice_text(range.start - 1..range.start) == "\n";
        let before = if at_line_start {
            None
        } else {
            self.tags_at(range.start - 1)
        };
        let inherited = before
            .or_else(|| self.tags_at(range.end))
            .map(RunTags::typing_attributes)
            .unwrap_or_default();
        self.remove(range.clone())?;
        self.insert(range.start, text, inherited)
    }

    /// Apply `f` to the tags of every run covering `range`.
    pub fn update_tags(
        &mut self,
        range: Range<usize>,
        mut f: impl FnMut(&mut RunTags),
    ) -> Result<(), EditError> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }
        let runs = self.split_range(&range);
        for run in &mut self.runs[runs.clone()] {
            f(&mut run.tags);
        }
        self.normalize();
        Ok(())
    }

    /// Apply `f` char by char; `f` receives the absolute offset.
    pub fn update_tags_per_char(
        &mut self,
        range: Range<usize>,
        mut f: impl FnMut(usize, &mut RunTags),
    ) -> Result<(), EditError> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }
        let runs = self.split_range(&range);
        let mut rebuilt: Vec<Run> = Vec::new();
        let mut offset = range.start;
        for run in self.runs.drain(runs.clone()) {
            for ch in run.text.chars() {
                let mut tags = run.tags.clone();
                f(offset, &mut tags);
                offset += 1;
                match rebuilt.last_mut() {
                    Some(last)
                        if last.tags == tags
                            && last.style == run.style
                            && last.paragraph == run.paragraph =>
                    {
                        last.text.push(ch);
                    }
                    _ => {
                        let mut piece = Run::new(ch.to_string(), tags);
                        piece.style = run.style.clone();
                        piece.paragraph = run.paragraph.clone();
                        rebuilt.push(piece);
                    }
                }
            }
        }
        self.runs.splice(runs.start..runs.start, rebuilt);
        self.normalize();
        Ok(())
    }

    /// Recompute derived styles for runs covering `range`.
    pub fn update_styles(
        &mut self,
        range: Range<usize>,
        mut f: impl FnMut(&RunTags, &mut RunStyle, &mut ParagraphStyle),
    ) -> Result<(), EditError> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }
        let runs = self.split_range(&range);
        for run in &mut self.runs[runs.clone()] {
            f(&run.tags, &mut run.style, &mut run.paragraph);
        }
        self.normalize();
        Ok(())
    }

    fn check_offset(&self, offset: usize) -> Result<(), EditError> {
        let len = self.len();
        if offset > len {
            return Err(EditError::OffsetOutOfBounds { offset, len });
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), EditError> {
        if range.start > range.end {
            return Err(EditError::InvertedRange {
                start: range.start,
                end: range.end,
            });
        }
        self.check_offset(range.end)
    }

    /// Split so a run boundary sits at `offset`; returns the index of the
    /// run starting there (`runs.len()` at the end).
    fn split_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for i in 0..self.runs.len() {
            let len = self.runs[i].char_len();
            if offset == pos {
                return i;
            }
            if offset < pos + len {
                let byte = char_to_byte(&self.runs[i].text, offset - pos);
                let tail_text = self.runs[i].text.split_off(byte);
                let mut tail = self.runs[i].clone();
                tail.text = tail_text;
                self.runs.insert(i + 1, tail);
                return i + 1;
            }
            pos += len;
        }
        self.runs.len()
    }

    /// Split at both ends of `range`; returns the indices of the runs it
    /// covers. The start goes first so the end split sees current indices.
    fn split_range(&mut self, range: &Range<usize>) -> Range<usize> {
        let start = self.split_at(range.start);
        let end = self.split_at(range.end);
        start..end
    }

    fn normalize(&mut self) {
        self.runs.retain(|r| !r.text.is_empty());
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match merged.last_mut() {
                Some(last) if last.same_attributes(&run) => last.text.push_str(&run.text),
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockKind;
    use pretty_assertions::assert_eq;

    fn heading_doc() -> Document {
        Document::from_runs(vec![
            Run::new("Title\n", RunTags::block(BlockKind::Heading(1))),
            Run::new("body", RunTags::block(BlockKind::Paragraph)),
        ])
    }

    #[test]
    fn text_and_len_count_chars() {
        let doc = Document::plain("a•b");
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.text(), "a•b");
    }

    #[test]
    fn insert_splits_runs_and_merges_equal_neighbours() {
        let mut doc = heading_doc();
        doc.insert(2, "XY", RunTags::block(BlockKind::Heading(1)))
            .unwrap();
        assert_eq!(doc.text(), "TiXYtle\nbody");
        assert_eq!(doc.runs().len(), 2);
    }

    #[test]
    fn insert_with_other_tags_creates_a_run() {
        let mut doc = heading_doc();
        let marker = RunTags {
            is_list_marker: true,
            ..RunTags::block(BlockKind::Heading(1))
        };
        doc.insert(0, "•", marker).unwrap();
        assert_eq!(doc.runs().len(), 3);
        assert!(doc.tags_at(0).unwrap().is_list_marker);
        assert!(!doc.tags_at(1).unwrap().is_list_marker);
    }

    #[test]
    fn remove_across_runs() {
        let mut doc = heading_doc();
        doc.remove(3..8).unwrap();
        assert_eq!(doc.text(), "Titdy");
    }

    #[test]
    fn remove_inside_one_run() {
        let mut doc = Document::from_runs(vec![Run::new(
            "- a\n- b",
            RunTags::block(BlockKind::BulletList),
        )]);
        doc.remove(4..6).unwrap();
        assert_eq!(doc.text(), "- a\nb");
    }

    #[test]
    fn update_tags_inside_one_run() {
        let mut doc = heading_doc();
        doc.update_tags(1..3, |tags| tags.strikethrough = true).unwrap();
        assert!(!doc.tags_at(0).unwrap().strikethrough);
        assert!(doc.tags_at(1).unwrap().strikethrough);
        assert!(doc.tags_at(2).unwrap().strikethrough);
        assert!(!doc.tags_at(3).unwrap().strikethrough);
        assert_eq!(doc.runs().len(), 4);
    }

    #[test]
    fn update_styles_inside_one_run() {
        let mut doc = heading_doc();
        let mut touched = 0;
        doc.update_styles(7..9, |_, style, _| {
            touched += 1;
            style.font_size = 3.0;
        })
        .unwrap();
        assert_eq!(touched, 1);
        let sizes: Vec<f32> = doc.runs().iter().map(|r| r.style.font_size).collect();
        assert_eq!(sizes.len(), 4);
        assert_eq!(sizes[2], 3.0);
    }

    #[test]
    fn out_of_range_edits_are_rejected() {
        let mut doc = heading_doc();
        assert_eq!(
            doc.insert(99, "x", RunTags::default()),
            Err(EditError::OffsetOutOfBounds { offset: 99, len: 10 })
        );
        #[allow(clippy::reversed_empty_ranges)]
        let inverted = 5..2;
        assert_eq!(
            doc.remove(inverted),
            Err(EditError::InvertedRange { start: 5, end: 2 })
        );
        assert_eq!(doc.text(), "Title\nbody");
    }

    #[test]
    fn replace_typed_inherits_previous_char_attributes() {
        let mut doc = heading_doc();
        doc.replace_typed(5..5, "!").unwrap();
        assert_eq!(doc.text(), "Title!\nbody");
        assert_eq!(
            doc.tags_at(5).unwrap().block_kind,
            Some(BlockKind::Heading(1))
        );
    }

    #[test]
    fn replace_typed_at_line_start_takes_that_lines_tags() {
        let mut doc = heading_doc();
        doc.replace_typed(6..6, "x").unwrap();
        assert_eq!(doc.text(), "Title\nxbody");
        assert_eq!(
            doc.tags_at(6).unwrap().block_kind,
            Some(BlockKind::Paragraph)
        );
    }

    #[test]
    fn update_tags_per_char_sees_absolute_offsets() {
        let mut doc = heading_doc();
        let mut seen = Vec::new();
        doc.update_tags_per_char(6..8, |o, tags| {
            seen.push(o);
            tags.strikethrough = o == 7;
        })
        .unwrap();
        assert_eq!(seen, vec![6, 7]);
        assert!(!doc.tags_at(6).unwrap().strikethrough);
        assert!(doc.tags_at(7).unwrap().strikethrough);
        assert_eq!(doc.text(), "Title\nbody");
    }

    #[test]
    fn update_tags_per_char_inside_one_run() {
        let mut doc = heading_doc();
        doc.update_tags_per_char(1..2, |_, tags| tags.strikethrough = true)
            .unwrap();
        assert_eq!(doc.text(), "Title\nbody");
        assert!(doc.tags_at(1).unwrap().strikethrough);
        assert!(!doc.tags_at(2).unwrap().strikethrough);
    }

    #[test]
    fn pieces_and_slices_are_clamped() {
        let doc = heading_doc();
        assert_eq!(doc.slice_text(4..7), "e\nb");
        assert_eq!(doc.slice_text(8..100), "dy");
    }
}
