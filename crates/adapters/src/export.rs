use std::fs;
use std::path::{Path, PathBuf};

use qgrid_core::boundary::{export_column_intervals, map_dimension_boundary_union, union};
use qgrid_core::csv::CsvOptions;
use qgrid_core::grid::Grid;
use qgrid_core::range::{Interval, Range};
use qgrid_core::range_helper::selection_to_csv;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing is selected")]
    EmptySelection,
    #[error("failed to write export file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize JSON export: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Picks the format from the file extension; anything but `.json` is CSV.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(extension) if extension.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

fn selected_row_count(ranges: &[Range]) -> usize {
    let rows: Vec<Interval> = ranges.iter().map(Range::rows).collect();
    union(&rows)
        .iter()
        .map(|interval| interval.high - interval.low + 1)
        .sum()
}

fn write_file(path: &Path, content: &str) -> Result<(), ExportError> {
    fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the selection as CSV. Returns the number of data rows written.
pub fn export_selection_to_csv(
    path: &Path,
    grid: &dyn Grid,
    ranges: &[Range],
    options: &CsvOptions,
    with_headers: bool,
) -> Result<usize, ExportError> {
    if ranges.is_empty() {
        return Err(ExportError::EmptySelection);
    }

    let mut content = selection_to_csv(grid, ranges, options, with_headers);
    content.push('\n');
    write_file(path, &content)?;

    let written = selected_row_count(ranges);
    log::info!("exported {written} row(s) to {}", path.display());
    Ok(written)
}

/// Writes the selection as a JSON array with one object per selected row,
/// keyed by column name. Returns the number of objects written.
pub fn export_selection_to_json(
    path: &Path,
    grid: &dyn Grid,
    ranges: &[Range],
) -> Result<usize, ExportError> {
    if ranges.is_empty() {
        return Err(ExportError::EmptySelection);
    }

    let columns = grid.columns();
    let column_indexes =
        map_dimension_boundary_union(&export_column_intervals(columns, ranges), |col| col);
    let rows: Vec<Interval> = ranges.iter().map(Range::rows).collect();

    let records = map_dimension_boundary_union(&union(&rows), |row| {
        let mut object = Map::with_capacity(column_indexes.len());
        for column in column_indexes.iter().filter_map(|index| columns.get(*index)) {
            let value = column
                .field
                .as_deref()
                .and_then(|field| grid.item(row).and_then(|item| item.get(field)))
                .cloned()
                .unwrap_or(Value::Null);
            object.insert(column.name.clone(), value);
        }
        Value::Object(object)
    });

    let payload = serde_json::to_string_pretty(&records)?;
    write_file(path, &payload)?;
    log::info!("exported {} row(s) to {}", records.len(), path.display());
    Ok(records.len())
}

pub fn export_selection(
    path: &Path,
    grid: &dyn Grid,
    ranges: &[Range],
    options: &CsvOptions,
    with_headers: bool,
) -> Result<usize, ExportError> {
    match ExportFormat::from_path(path) {
        ExportFormat::Csv => export_selection_to_csv(path, grid, ranges, options, with_headers),
        ExportFormat::Json => export_selection_to_json(path, grid, ranges),
    }
}
