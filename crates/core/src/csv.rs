use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Quoting {
    All,
    #[default]
    Strings,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsvOptions {
    #[serde(default)]
    pub quoting: Quoting,
    #[serde(default = "default_quote_char")]
    pub quote_char: char,
    #[serde(default = "default_field_separator")]
    pub field_separator: char,
}

fn default_quote_char() -> char {
    '"'
}

fn default_field_separator() -> char {
    ','
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            quoting: Quoting::Strings,
            quote_char: default_quote_char(),
            field_separator: default_field_separator(),
        }
    }
}

impl CsvOptions {
    /// Comma separated, strings and JSON wrapped in single quotes.
    #[must_use]
    pub fn single_quoted() -> Self {
        Self {
            quoting: Quoting::Strings,
            quote_char: '\'',
            field_separator: ',',
        }
    }

    #[must_use]
    pub fn new(quoting: Quoting, quote_char: char, field_separator: char) -> Self {
        Self {
            quoting,
            quote_char,
            field_separator,
        }
    }

    fn quote(&self, text: &str) -> String {
        let quote = self.quote_char;
        let escaped = text.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Renders one cell value. Missing and null values are always empty.
    #[must_use]
    pub fn format_value(&self, value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => self.format_text(text),
            Some(value @ (Value::Array(_) | Value::Object(_))) => {
                let rendered = value.to_string();
                if self.quoting == Quoting::None {
                    rendered
                } else {
                    self.quote(&rendered)
                }
            }
            Some(value @ (Value::Bool(_) | Value::Number(_))) => {
                let rendered = value.to_string();
                if self.quoting == Quoting::All {
                    self.quote(&rendered)
                } else {
                    rendered
                }
            }
        }
    }

    #[must_use]
    pub fn format_text(&self, text: &str) -> String {
        match self.quoting {
            Quoting::None => text.to_string(),
            Quoting::All | Quoting::Strings => self.quote(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsvParseError {
    #[error("field separator and quote character must differ (both `{0}`)")]
    AmbiguousDialect(char),
    #[error("`{0}` is not an ASCII character and cannot delimit CSV")]
    NonAsciiDialect(char),
    #[error("malformed CSV at record {record}: {reason}")]
    Malformed { record: u64, reason: String },
}

fn dialect_byte(ch: char) -> Result<u8, CsvParseError> {
    u8::try_from(ch)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(CsvParseError::NonAsciiDialect(ch))
}

/// Splits CSV text into records. Quoted fields may contain separators,
/// newlines and doubled quote characters; every record must have as many
/// fields as the first one.
pub fn parse_csv(
    text: &str,
    field_separator: char,
    quote_char: char,
) -> Result<Vec<Vec<String>>, CsvParseError> {
    if field_separator == quote_char {
        return Err(CsvParseError::AmbiguousDialect(quote_char));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(dialect_byte(field_separator)?)
        .quote(dialect_byte(quote_char)?)
        .has_headers(false)
        .from_reader(text.as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|record| record.iter().map(str::to_string).collect())
                .map_err(|error| CsvParseError::Malformed {
                    record: error.position().map_or(0, csv::Position::record),
                    reason: error.to_string(),
                })
        })
        .collect()
}
