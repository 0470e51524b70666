//! Column layout for pipe tables, expressed as paragraph tab stops.
//!
//! Table rows are ordinary lines whose cells are separated by `\t`. Layout
//! only touches paragraph styles; run text and kinds are left alone.

use std::ops::Range;

use unicode_width::UnicodeWidthStr;

use crate::models::{ColumnAlignment, Document, Line, RunStyle, TabStop};
use crate::options::EngineOptions;

/// Measures the rendered width of a piece of text.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &RunStyle) -> f32;
}

/// Display columns times a fixed advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasurer {
    pub advance: f32,
}

impl MonospaceMeasurer {
    pub fn new(advance: f32) -> Self {
        Self { advance }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, _style: &RunStyle) -> f32 {
        UnicodeWidthStr::width(text) as f32 * self.advance
    }
}

/// Measured cells of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowCells {
    pub header: bool,
    pub widths: Vec<f32>,
    pub alignments: Vec<ColumnAlignment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub column_widths: Vec<f32>,
    pub tab_stops: Vec<TabStop>,
    /// Indent of the first column's text.
    pub head_indent: f32,
}

/// Column widths are the widest cell plus `inset` on both sides. Each column
/// after the first gets a tab stop placed for its alignment: left at the
/// column start plus inset, center at the middle, right at the end minus
/// inset.
pub fn layout_columns(rows: &[RowCells], inset: f32) -> TableLayout {
    let inset = inset.max(1.0);
    let columns = rows.iter().map(|r| r.widths.len()).max().unwrap_or(0);
    let alignments = rows
        .iter()
        .find(|r| r.header)
        .or(rows.first())
        .map(|r| r.alignments.clone())
        .unwrap_or_default();

    let column_widths: Vec<f32> = (0..columns)
        .map(|col| {
            let widest = rows
                .iter()
                .filter_map(|r| r.widths.get(col).copied())
                .fold(0.0f32, f32::max);
            widest + 2.0 * inset
        })
        .collect();

    let mut tab_stops = Vec::with_capacity(columns.saturating_sub(1));
    let mut x = 0.0f32;
    for (col, width) in column_widths.iter().enumerate() {
        if col > 0 {
            let alignment = alignments.get(col).copied().unwrap_or_default();
            let location = match alignment {
                ColumnAlignment::Left => x + inset,
                ColumnAlignment::Center => x + width / 2.0,
                ColumnAlignment::Right => x + width - inset,
            };
            tab_stops.push(TabStop {
                location,
                alignment,
            });
        }
        x += width;
    }

    TableLayout {
        column_widths,
        tab_stops,
        head_indent: inset,
    }
}

/// Maximal contiguous runs of lines that carry table cells.
pub fn table_groups(doc: &Document, lines: &[Line]) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start: Option<usize> = None;
    for (i, line) in lines.iter().enumerate() {
        let is_row = line.tags.table_cell.is_some()
            || doc
                .pieces(line.span())
                .iter()
                .any(|(_, _, run)| run.tags.table_cell.is_some());
        match (is_row, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                groups.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        groups.push(s..lines.len());
    }
    groups
}

/// Split a row on `\t` and measure each cell, skipping hidden runs.
pub fn measure_row(doc: &Document, line: &Line, measurer: &dyn TextMeasurer) -> RowCells {
    let mut widths = vec![0.0f32];
    let mut alignments = vec![
        line.tags
            .table_cell
            .map(|c| c.alignment)
            .unwrap_or_default(),
    ];
    for (_, text, run) in doc.pieces(line.span()) {
        let alignment = run.tags.table_cell.map(|c| c.alignment).unwrap_or_default();
        for (i, part) in text.split('\t').enumerate() {
            if i > 0 {
                widths.push(0.0);
                alignments.push(alignment);
            }
            if !run.style.hidden && !part.is_empty() {
                if let Some(w) = widths.last_mut() {
                    *w += measurer.measure(part, &run.style);
                }
            }
        }
    }
    RowCells {
        header: line.tags.table_cell.is_some_and(|c| c.header),
        widths,
        alignments,
    }
}

/// Lay out every table group and write tab stops, indent and row tints into
/// the paragraph styles of its rows. Returns the number of groups.
pub fn apply_table_layout(
    doc: &mut Document,
    measurer: &dyn TextMeasurer,
    options: &EngineOptions,
) -> usize {
    let lines = doc.lines();
    let groups = table_groups(doc, &lines);
    for group in &groups {
        let rows: Vec<RowCells> = lines[group.clone()]
            .iter()
            .map(|l| measure_row(doc, l, measurer))
            .collect();
        let layout = layout_columns(&rows, options.table_cell_inset);
        let mut body_index = 0usize;
        for (line, row) in lines[group.clone()].iter().zip(&rows) {
            let tint = if row.header {
                options.theme.table_header
            } else {
                body_index += 1;
                if body_index % 2 == 0 {
                    options.theme.table_row_alt
                } else {
                    options.theme.table_row
                }
            };
            let end = if line.has_newline { line.end + 1 } else { line.end };
            let result = doc.update_styles(line.start..end, |_, _, paragraph| {
                paragraph.tab_stops = layout.tab_stops.clone();
                paragraph.head_indent = layout.head_indent;
                paragraph.first_line_indent = layout.head_indent;
                paragraph.background = Some(tint);
            });
            if let Err(err) = result {
                log::warn!("skipping table row layout: {err}");
            }
        }
        log::trace!(
            "table of {} rows laid out as {:?}",
            rows.len(),
            layout.column_widths
        );
    }
    groups.len()
}
