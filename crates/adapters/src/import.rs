use std::fs;
use std::path::{Path, PathBuf};

use qgrid_core::csv::{parse_csv, CsvOptions, CsvParseError};
use qgrid_core::grid::{ColumnDefinition, Row};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read result file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse result file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: CsvParseError,
    },
    #[error("result file at {path} has no header record")]
    MissingHeader { path: PathBuf },
    #[error("record {record} has {found} fields but the header has {expected}")]
    RaggedRecord {
        record: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedResult {
    pub columns: Vec<ColumnDefinition>,
    pub rows: Vec<Row>,
}

/// Turns parsed records into rows keyed by the data columns' fields, in
/// column position order. Empty fields become null. Records read by
/// [`load_csv_result`] always match the header width; shorter records handed
/// in directly are padded with nulls.
pub fn records_to_rows(
    columns: &[ColumnDefinition],
    records: Vec<Vec<String>>,
) -> Result<Vec<Row>, ImportError> {
    let targets: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.pos.is_some())
        .map(|(index, _)| index)
        .collect();
    clipboard_records_to_rows(columns, &targets, records, &[])
}

/// Turns pasted records back into rows. Field `i` of every record lands in
/// the column at `targets[i]`; data columns that were not copied stay null.
/// `originals` are the copied rows in record order and tell a copied empty
/// string apart from a copied null.
pub fn clipboard_records_to_rows(
    columns: &[ColumnDefinition],
    targets: &[usize],
    records: Vec<Vec<String>>,
    originals: &[Row],
) -> Result<Vec<Row>, ImportError> {
    let data_columns: Vec<&ColumnDefinition> = columns
        .iter()
        .filter(|column| column.pos.is_some() && column.field.is_some())
        .collect();

    records
        .into_iter()
        .enumerate()
        .map(|(record, values)| {
            if values.len() > targets.len() {
                return Err(ImportError::RaggedRecord {
                    record,
                    expected: targets.len(),
                    found: values.len(),
                });
            }
            let mut row = Row::with_capacity(data_columns.len());
            for column in &data_columns {
                if let Some(field) = column.field.as_deref() {
                    row.insert(field.to_string(), Value::Null);
                }
            }
            for (text, target) in values.into_iter().zip(targets) {
                let Some(column) = columns.get(*target) else {
                    continue;
                };
                let Some(field) = column.field.as_deref() else {
                    continue;
                };
                let original = originals.get(record).and_then(|item| item.get(field));
                row.insert(field.to_string(), clipboard_value(column, text, original));
            }
            Ok(row)
        })
        .collect()
}

/// Restores a typed value from its copied text. Boolean columns read back
/// `true`/`false` and anything else as null; an empty field stays an empty
/// string only when the copied value was one.
fn clipboard_value(column: &ColumnDefinition, text: String, original: Option<&Value>) -> Value {
    if column.column_type.as_deref() == Some("boolean") {
        return match text.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Null,
        };
    }
    if text.is_empty() {
        return match original {
            Some(Value::String(_)) => Value::String(text),
            _ => Value::Null,
        };
    }
    Value::String(text)
}

/// Loads a CSV result set whose first record names the columns.
pub fn load_csv_result(path: &Path, options: &CsvOptions) -> Result<ImportedResult, ImportError> {
    let raw = fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut records = parse_csv(&raw, options.field_separator, options.quote_char).map_err(
        |source| ImportError::Parse {
            path: path.to_path_buf(),
            source,
        },
    )?;
    if records.is_empty() {
        return Err(ImportError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    let header = records.remove(0);
    let columns: Vec<ColumnDefinition> = header
        .into_iter()
        .enumerate()
        .map(|(pos, name)| ColumnDefinition::data(name, pos))
        .collect();
    let rows = records_to_rows(&columns, records)?;
    log::info!(
        "loaded {} row(s) and {} column(s) from {}",
        rows.len(),
        columns.len(),
        path.display()
    );

    Ok(ImportedResult { columns, rows })
}
