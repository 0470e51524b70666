//! Caret and selection bookkeeping.
//!
//! Every offset shift the engine causes goes through [`translate`], so an
//! engine-side insertion or removal leaves the selection on the same
//! characters it covered before.

use std::ops::Range;

/// One caret or a set of disjoint ranges, in char offsets.
///
/// Kept normalized: ranges are sorted, non-overlapping and never inverted,
/// and there is always at least one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<Range<usize>>,
}

impl Default for Selection {
    fn default() -> Self {
        Self::caret(0)
    }
}

impl Selection {
    pub fn caret(at: usize) -> Self {
        Self {
            ranges: vec![at..at],
        }
    }

    pub fn range(range: Range<usize>) -> Self {
        Self::from_ranges(vec![range])
    }

    /// Inverted ranges are flipped, overlapping ones merged.
    pub fn from_ranges(ranges: Vec<Range<usize>>) -> Self {
        let mut ranges: Vec<Range<usize>> = ranges
            .into_iter()
            .map(|r| r.start.min(r.end)..r.start.max(r.end))
            .collect();
        ranges.sort_by_key(|r| (r.start, r.end));
        let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start < last.end || range == *last => {
                    last.end = last.end.max(range.end);
                }
                _ => merged.push(range),
            }
        }
        if merged.is_empty() {
            merged.push(0..0);
        }
        Self { ranges: merged }
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// The first range; the caret when nothing is selected.
    pub fn primary(&self) -> Range<usize> {
        self.ranges.first().cloned().unwrap_or(0..0)
    }

    pub fn is_caret(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_empty()
    }

    pub fn caret_offset(&self) -> Option<usize> {
        self.is_caret().then(|| self.ranges[0].start)
    }

    /// Whether any range touches `[start, end]`, both ends inclusive, so a
    /// selection ending exactly at a line start still counts for that line.
    pub fn touches(&self, start: usize, end: usize) -> bool {
        self.ranges.iter().any(|r| r.start <= end && r.end >= start)
    }

    /// Clamp every offset into `0..=len`.
    pub fn clamp(&self, len: usize) -> Self {
        Self::from_ranges(
            self.ranges
                .iter()
                .map(|r| r.start.min(len)..r.end.min(len))
                .collect(),
        )
    }
}

/// An engine-side mutation, in char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetEdit {
    Insert { at: usize, len: usize },
    Remove { at: usize, len: usize },
}

fn translate_offset(offset: usize, edit: OffsetEdit, is_end: bool, is_caret: bool) -> usize {
    match edit {
        OffsetEdit::Insert { at, len } => {
            // A caret or range start sitting on the insertion point moves
            // with the text after it; a range end there stays put.
            let shifts = if is_caret || !is_end {
                offset >= at
            } else {
                offset > at
            };
            if shifts { offset + len } else { offset }
        }
        OffsetEdit::Remove { at, len } => {
            if offset <= at {
                offset
            } else if offset >= at + len {
                offset - len
            } else {
                at
            }
        }
    }
}

/// Translate `selection` through one engine-side edit.
pub fn translate(selection: &Selection, edit: OffsetEdit) -> Selection {
    Selection::from_ranges(
        selection
            .ranges
            .iter()
            .map(|r| {
                let caret = r.is_empty();
                translate_offset(r.start, edit, false, caret)
                    ..translate_offset(r.end, edit, true, caret)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::before(3, OffsetEdit::Insert { at: 1, len: 2 }, 5)]
    #[case::at_caret(3, OffsetEdit::Insert { at: 3, len: 2 }, 5)]
    #[case::after(3, OffsetEdit::Insert { at: 4, len: 2 }, 3)]
    #[case::removed_before(10, OffsetEdit::Remove { at: 2, len: 2 }, 8)]
    #[case::removed_after(1, OffsetEdit::Remove { at: 2, len: 2 }, 1)]
    #[case::inside_removal(3, OffsetEdit::Remove { at: 2, len: 2 }, 2)]
    fn carets_follow_their_character(
        #[case] caret: usize,
        #[case] edit: OffsetEdit,
        #[case] expected: usize,
    ) {
        assert_eq!(translate(&Selection::caret(caret), edit), Selection::caret(expected));
    }

    #[test]
    fn prefix_swap_moves_a_later_caret_by_the_net_delta() {
        // "- " replaced by a one-char bullet on an earlier line.
        let sel = Selection::caret(10);
        let sel = translate(&sel, OffsetEdit::Remove { at: 0, len: 2 });
        let sel = translate(&sel, OffsetEdit::Insert { at: 0, len: 1 });
        assert_eq!(sel, Selection::caret(9));
    }

    #[test]
    fn insertion_inside_a_range_grows_it() {
        let sel = translate(&Selection::range(2..6), OffsetEdit::Insert { at: 4, len: 3 });
        assert_eq!(sel.ranges(), &[2..9]);
    }

    #[test]
    fn insertion_at_range_end_does_not_grow_it() {
        let sel = translate(&Selection::range(2..6), OffsetEdit::Insert { at: 6, len: 3 });
        assert_eq!(sel.ranges(), &[2..6]);
    }

    #[test]
    fn removal_overlapping_a_range_clamps_both_ends() {
        let sel = translate(&Selection::range(3..8), OffsetEdit::Remove { at: 1, len: 4 });
        assert_eq!(sel.ranges(), &[1..4]);
    }

    #[test]
    fn ranges_are_normalized() {
        #[allow(clippy::reversed_empty_ranges)]
        let sel = Selection::from_ranges(vec![9..7, 1..3, 2..4]);
        assert_eq!(sel.ranges(), &[1..4, 7..9]);
        assert_eq!(Selection::from_ranges(vec![]), Selection::caret(0));
    }

    #[test]
    fn touches_includes_both_line_ends() {
        let sel = Selection::caret(5);
        assert!(sel.touches(0, 5));
        assert!(sel.touches(5, 9));
        assert!(!sel.touches(6, 9));
    }

    #[test]
    fn clamp_pulls_offsets_into_the_document() {
        assert_eq!(Selection::range(3..40).clamp(10).ranges(), &[3..10]);
        assert_eq!(Selection::caret(40).clamp(10), Selection::caret(10));
    }
}
