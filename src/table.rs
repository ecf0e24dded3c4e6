// Raw tabular rows handed to the engine by the ingestion layer

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::PaddockError;

/// A single raw cell as it came out of a source table.
///
/// CSV sources only ever produce `Null` and `Text`; JSON sources may carry
/// real numbers and booleans.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Build a value from a CSV field, empty fields are null.
    pub fn from_field(field: &str) -> Self {
        if field.trim().is_empty() {
            RawValue::Null
        } else {
            RawValue::Text(field.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell. Unparsable text, NaN and null have none.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            RawValue::Null => return None,
            RawValue::Bool(b) => {
                if *b {
                    1.
                } else {
                    0.
                }
            }
            RawValue::Number(n) => *n,
            RawValue::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        if value.is_nan() { None } else { Some(value) }
    }

    /// Text view of the cell. Integral numbers render without a fraction so
    /// that car number `13.0` reads as `"13"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Number(n) if n.fract() == 0. && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Mapping from column name to raw cell.
pub type RawRow = HashMap<String, RawValue>;

/// Typed accessors over a raw row.
pub trait RowExt {
    fn number(&self, column: &str) -> Option<f64>;
    fn text(&self, column: &str) -> Option<String>;

    /// First alias that is present and non-null wins.
    fn first_number(&self, aliases: &[&str]) -> Option<f64> {
        aliases.iter().find_map(|alias| self.number(alias))
    }
}

impl RowExt for RawRow {
    fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(RawValue::as_f64)
    }

    fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(RawValue::as_text)
    }
}

/// Whether any row in the chunk carries the column.
pub fn chunk_has_column(rows: &[RawRow], column: &str) -> bool {
    rows.iter().any(|row| row.contains_key(column))
}

/// Parse a car number the way results tables write it ("13", "13.0", 13).
pub fn car_number(value: &RawValue) -> Option<u32> {
    let number = value.as_f64()?;
    if number >= 0. && number.fract() == 0. && number <= u32::MAX as f64 {
        Some(number as u32)
    } else {
        None
    }
}

pub(crate) fn record_to_row(headers: &csv::StringRecord, record: &csv::StringRecord) -> RawRow {
    headers
        .iter()
        .zip(record.iter())
        .map(|(column, field)| (column.trim().to_string(), RawValue::from_field(field)))
        .collect()
}

/// Field delimiter byte for a table, which must be a single ASCII character.
pub fn delimiter_byte(delimiter: char) -> Result<u8, PaddockError> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(PaddockError::InvalidDelimiter { delimiter })
}

/// Read a whole delimited table into rows.
pub fn read_table(path: &Path, delimiter: u8) -> Result<Vec<RawRow>, PaddockError> {
    let path_str = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| PaddockError::TableReadError {
            path: path_str.clone(),
            source: e,
        })?;
    let headers = reader
        .headers()
        .map_err(|e| PaddockError::TableReadError {
            path: path_str.clone(),
            source: e,
        })?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PaddockError::TableReadError {
            path: path_str.clone(),
            source: e,
        })?;
        rows.push(record_to_row(&headers, &record));
    }
    debug!("Loaded {} rows from {}", rows.len(), path_str);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_delimiter_must_be_ascii() {
        assert_eq!(delimiter_byte(';').unwrap(), b';');
        assert_eq!(delimiter_byte('\t').unwrap(), b'\t');
        assert!(matches!(
            delimiter_byte('§'),
            Err(PaddockError::InvalidDelimiter { delimiter: '§' })
        ));
        assert!(delimiter_byte('€').is_err());
    }

    #[test]
    fn test_numeric_access_parses_text() {
        let row: RawRow = [
            ("Speed".to_string(), RawValue::from(" 132.5 ")),
            ("Gear".to_string(), RawValue::Number(4.)),
            ("ath".to_string(), RawValue::from("n/a")),
            ("pbrake_f".to_string(), RawValue::Null),
        ]
        .into_iter()
        .collect();

        assert_eq!(row.number("Speed"), Some(132.5));
        assert_eq!(row.number("Gear"), Some(4.));
        assert_eq!(row.number("ath"), None);
        assert_eq!(row.number("pbrake_f"), None);
        assert_eq!(row.number("missing"), None);
    }

    #[test]
    fn test_first_number_skips_null_aliases() {
        let row: RawRow = [
            ("VBOX_Lat_Min".to_string(), RawValue::Null),
            ("VBOX_Lat".to_string(), RawValue::Number(33.48)),
        ]
        .into_iter()
        .collect();
        assert_eq!(row.first_number(&["VBOX_Lat_Min", "VBOX_Lat"]), Some(33.48));
        assert_eq!(row.first_number(&["nothing", "else"]), None);
    }

    #[test]
    fn test_text_renders_integral_numbers_without_fraction() {
        assert_eq!(RawValue::Number(13.).as_text(), Some("13".to_string()));
        assert_eq!(RawValue::Number(1.5).as_text(), Some("1.5".to_string()));
        assert_eq!(RawValue::from("  ").as_text(), None);
        assert!(RawValue::from("").is_null());
    }

    #[test]
    fn test_car_number() {
        assert_eq!(car_number(&RawValue::from("72")), Some(72));
        assert_eq!(car_number(&RawValue::Number(22.)), Some(22));
        assert_eq!(car_number(&RawValue::from("GR86-022")), None);
        assert_eq!(car_number(&RawValue::Number(-3.)), None);
    }

    #[test]
    fn test_read_table_with_semicolons() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "POSITION;NUMBER;FL_TIME").unwrap();
        writeln!(file, "1;13;1:37.428").unwrap();
        writeln!(file, "2;22;").unwrap();

        let rows = read_table(file.path(), b';').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("FL_TIME"), Some("1:37.428".to_string()));
        assert!(rows[1]["FL_TIME"].is_null());
    }
}
