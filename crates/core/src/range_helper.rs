use crate::boundary::{
    export_column_intervals, map_dimension_boundary_union, ranges_to_csv_with, union,
};
use crate::csv::CsvOptions;
use crate::grid::{ColumnDefinition, Grid};
use crate::range::{Interval, Range};

/// First through last selectable column of the grid.
#[must_use]
pub fn selectable_span(grid: &dyn Grid) -> Option<Interval> {
    let columns = grid.columns();
    let first = columns.iter().position(|column| column.selectable)?;
    let last = columns.iter().rposition(|column| column.selectable)?;
    Some(Interval::new(first, last))
}

#[must_use]
pub fn range_for_row(grid: &dyn Grid, row: usize) -> Option<Range> {
    let span = selectable_span(grid)?;
    Some(Range::new(row, span.low, row, span.high))
}

#[must_use]
pub fn range_for_column(grid: &dyn Grid, column: usize) -> Option<Range> {
    let last_row = grid.row_count().checked_sub(1)?;
    Some(Range::new(0, column, last_row, column))
}

#[must_use]
pub fn range_for_whole_grid(grid: &dyn Grid) -> Option<Range> {
    let span = selectable_span(grid)?;
    let last_row = grid.row_count().checked_sub(1)?;
    Some(Range::new(0, span.low, last_row, span.high))
}

#[must_use]
pub fn is_range_selected(ranges: &[Range], target: &Range) -> bool {
    ranges.contains(target)
}

#[must_use]
pub fn add_range(ranges: &[Range], range: Range) -> Vec<Range> {
    let mut next = ranges.to_vec();
    if !next.contains(&range) {
        next.push(range);
    }
    next
}

#[must_use]
pub fn remove_range(ranges: &[Range], target: &Range) -> Vec<Range> {
    ranges
        .iter()
        .filter(|range| *range != target)
        .copied()
        .collect()
}

#[must_use]
pub fn are_all_ranges_rows(ranges: &[Range], grid: &dyn Grid) -> bool {
    ranges
        .iter()
        .all(|range| range_for_row(grid, range.from_row) == Some(*range))
}

#[must_use]
pub fn are_all_ranges_single_columns(ranges: &[Range], grid: &dyn Grid) -> bool {
    ranges
        .iter()
        .all(|range| range_for_column(grid, range.from_cell) == Some(*range))
}

fn is_complete_row_range(span: Option<Interval>, range: &Range) -> bool {
    span.is_some_and(|span| range.from_cell == span.low && range.to_cell == span.high)
}

fn is_complete_column_range(row_count: usize, range: &Range) -> bool {
    row_count > 0 && range.from_row == 0 && range.to_row == row_count - 1
}

#[must_use]
pub fn are_all_ranges_complete_rows(grid: &dyn Grid, ranges: &[Range]) -> bool {
    let span = selectable_span(grid);
    ranges.iter().all(|range| is_complete_row_range(span, range))
}

/// Row indexes covered by full-width ranges, ascending and without repeats.
#[must_use]
pub fn get_indexes_of_complete_rows(grid: &dyn Grid, ranges: &[Range]) -> Vec<usize> {
    let span = selectable_span(grid);
    let rows: Vec<Interval> = ranges
        .iter()
        .filter(|range| is_complete_row_range(span, range))
        .map(Range::rows)
        .collect();
    map_dimension_boundary_union(&union(&rows), |row| row)
}

/// Column indexes covered by full-height ranges, ascending and without repeats.
#[must_use]
pub fn get_indexes_of_complete_columns(grid: &dyn Grid, ranges: &[Range]) -> Vec<usize> {
    let row_count = grid.row_count();
    let columns: Vec<Interval> = ranges
        .iter()
        .filter(|range| is_complete_column_range(row_count, range))
        .map(Range::cells)
        .collect();
    map_dimension_boundary_union(&union(&columns), |column| column)
}

#[must_use]
pub fn is_entire_grid_selected(grid: &dyn Grid, ranges: &[Range]) -> bool {
    match ranges {
        [only] => range_for_whole_grid(grid) == Some(*only),
        _ => false,
    }
}

/// Whether the first column carries result data rather than a synthetic
/// row header.
#[must_use]
pub fn is_first_column_data(columns: &[ColumnDefinition]) -> bool {
    columns.first().is_some_and(|column| column.pos.is_some())
}

#[must_use]
pub fn is_any_cell_of_row_selected(ranges: &[Range], row: usize) -> bool {
    ranges.iter().any(|range| range.rows().contains(row))
}

#[must_use]
pub fn is_any_cell_of_column_selected(ranges: &[Range], column: usize) -> bool {
    ranges.iter().any(|range| range.cells().contains(column))
}

#[must_use]
pub fn is_range_entirely_within_selected_ranges(ranges: &[Range], target: &Range) -> bool {
    target
        .cells_iter()
        .all(|cell| ranges.iter().any(|range| range.contains(cell.row, cell.cell)))
}

/// Renders the selection as CSV text, optionally preceded by a header line
/// holding the exported column names.
#[must_use]
pub fn selection_to_csv(
    grid: &dyn Grid,
    ranges: &[Range],
    options: &CsvOptions,
    include_header: bool,
) -> String {
    if ranges.is_empty() {
        return String::new();
    }

    let columns = grid.columns();
    let body = ranges_to_csv_with(columns, ranges, options, |row| grid.item(row));
    if !include_header {
        return body;
    }

    let separator = options.field_separator.to_string();
    let header = map_dimension_boundary_union(&export_column_intervals(columns, ranges), |col| {
        columns
            .get(col)
            .map(|column| options.format_text(&column.name))
            .unwrap_or_default()
    })
    .join(&separator);
    format!("{header}\n{body}")
}
