use crate::csv::CsvOptions;
use crate::grid::{ColumnDefinition, Row};
use crate::range::{Interval, Range};
use crate::range_helper::is_first_column_data;

/// Merges overlapping and adjacent intervals. The result is sorted and
/// disjoint; unioning it again yields the same list.
#[must_use]
pub fn union(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort_unstable();

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.low <= last.high.saturating_add(1) => {
                last.high = last.high.max(interval.high);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

pub fn map_dimension_boundary_union<T>(
    unioned: &[Interval],
    f: impl FnMut(usize) -> T,
) -> Vec<T> {
    unioned
        .iter()
        .flat_map(|interval| interval.low..=interval.high)
        .map(f)
        .collect()
}

/// Visits the cross product of the unioned row and column intervals, row by
/// row, handing each row's cell results to `row_fn`.
pub fn map_over_2d_array<T, R>(
    row_intervals: &[Interval],
    col_intervals: &[Interval],
    mut cell_fn: impl FnMut(usize, usize) -> T,
    mut row_fn: impl FnMut(Vec<T>) -> R,
) -> Vec<R> {
    let rows = union(row_intervals);
    let cols = union(col_intervals);
    map_dimension_boundary_union(&rows, |row| {
        let cells = map_dimension_boundary_union(&cols, |col| cell_fn(row, col));
        row_fn(cells)
    })
}

/// Unions `col_intervals` and drops column 0 from the result.
#[must_use]
pub fn remove_first_column(col_intervals: &[Interval]) -> Vec<Interval> {
    let mut unioned = union(col_intervals);
    if let Some(first) = unioned.first_mut() {
        if first.low == 0 {
            if first.high == 0 {
                unioned.remove(0);
            } else {
                first.low = 1;
            }
        }
    }
    unioned
}

/// Column intervals exported for `ranges`; the synthetic row header column
/// is never exported.
#[must_use]
pub fn export_column_intervals(columns: &[ColumnDefinition], ranges: &[Range]) -> Vec<Interval> {
    let col_intervals: Vec<Interval> = ranges.iter().map(Range::cells).collect();
    if is_first_column_data(columns) {
        union(&col_intervals)
    } else {
        remove_first_column(&col_intervals)
    }
}

/// Renders the union of `ranges` as CSV, one line per selected row.
#[must_use]
pub fn ranges_to_csv(
    data: &[Row],
    columns: &[ColumnDefinition],
    ranges: &[Range],
    options: &CsvOptions,
) -> String {
    ranges_to_csv_with(columns, ranges, options, |row| data.get(row))
}

pub(crate) fn ranges_to_csv_with<'a>(
    columns: &[ColumnDefinition],
    ranges: &[Range],
    options: &CsvOptions,
    item: impl Fn(usize) -> Option<&'a Row>,
) -> String {
    let row_intervals: Vec<Interval> = ranges.iter().map(Range::rows).collect();
    let col_intervals = export_column_intervals(columns, ranges);

    let separator = options.field_separator.to_string();
    let lines = map_over_2d_array(
        &row_intervals,
        &col_intervals,
        |row, col| {
            let value = columns
                .get(col)
                .and_then(|column| column.field.as_deref())
                .and_then(|field| item(row).and_then(|values| values.get(field)));
            options.format_value(value)
        },
        |cells| cells.join(&separator),
    );
    lines.join("\n")
}
