use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{IngestError, Result};
use crate::models::batch::{RowBatch, Value};

/// Declared storage type of a target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    BigInt,
    Integer,
    Double,
    Text,
    Date,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
        }
    }

    /// Parse a raw source field into a value of this type. Empty fields are null.
    ///
    /// Text is kept exactly as read. Numbers and dates ignore surrounding
    /// whitespace, so a blank numeric or date field is null as well.
    pub fn parse_field(&self, raw: &str, date_format: &str) -> std::result::Result<Value, String> {
        if raw.is_empty() {
            return Ok(Value::Null);
        }

        let trimmed = raw.trim();
        match self {
            ColumnType::Text => Ok(Value::Text(raw.to_string())),
            _ if trimmed.is_empty() => Ok(Value::Null),
            ColumnType::BigInt | ColumnType::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| format!("invalid integer '{}': {}", trimmed, e)),
            ColumnType::Double => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("invalid number '{}': {}", trimmed, e)),
            ColumnType::Date => NaiveDate::parse_from_str(trimmed, date_format)
                .map(Value::Date)
                .map_err(|e| format!("invalid date '{}' for format {}: {}", trimmed, date_format, e)),
        }
    }

    /// Check a value against this type, widening integers into floats where needed.
    pub fn coerce(&self, column: &str, value: &Value) -> Result<Value> {
        let coerced = match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (ColumnType::BigInt, Value::Integer(v)) => Some(Value::Integer(*v)),
            (ColumnType::Integer, Value::Integer(v)) => {
                i32::try_from(*v).ok().map(|_| Value::Integer(*v))
            }
            (ColumnType::Double, Value::Float(v)) => Some(Value::Float(*v)),
            (ColumnType::Double, Value::Integer(v)) => Some(Value::Float(*v as f64)),
            (ColumnType::Text, Value::Text(v)) => Some(Value::Text(v.clone())),
            (ColumnType::Date, Value::Date(v)) => Some(Value::Date(*v)),
            _ => None,
        };

        coerced.ok_or_else(|| IngestError::TypeMismatch {
            column: column.to_string(),
            expected: self.to_string(),
            found: format!("{} value '{}'", value.type_name(), value),
        })
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_type())
    }
}

impl FromStr for ColumnType {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bigint" | "int8" => Ok(ColumnType::BigInt),
            "integer" | "int" | "int4" => Ok(ColumnType::Integer),
            "double" | "float" | "float8" | "double precision" => Ok(ColumnType::Double),
            "text" | "string" | "varchar" => Ok(ColumnType::Text),
            "date" => Ok(ColumnType::Date),
            other => Err(IngestError::Config(format!("Unsupported column type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
}

/// Column layout of a target table, fixed before the first chunk is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<ColumnSpec>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(IngestError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Schema from `(name, type)` pairs.
    pub fn from_pairs(pairs: &[(&str, ColumnType)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|(name, column_type)| ColumnSpec {
                    name: name.to_string(),
                    column_type: *column_type,
                })
                .collect(),
        )
    }

    /// Every column declared with the same type.
    pub fn uniform(names: &[String], column_type: ColumnType) -> Result<Self> {
        Self::new(
            names
                .iter()
                .map(|name| ColumnSpec {
                    name: name.clone(),
                    column_type,
                })
                .collect(),
        )
    }

    /// Override the declared type of a named column.
    pub fn with_override(mut self, name: &str, column_type: ColumnType) -> Result<Self> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| IngestError::UnknownColumn(name.to_string()))?;
        column.column_type = column_type;
        Ok(self)
    }

    pub fn with_overrides<'a, I>(self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a (String, ColumnType)>,
    {
        overrides
            .into_iter()
            .try_fold(self, |schema, (name, column_type)| {
                schema.with_override(name, *column_type)
            })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check a batch header against the schema and coerce its values to the
    /// declared types.
    pub fn conform(&self, table: &str, batch: &RowBatch) -> Result<Vec<Vec<Value>>> {
        let names = batch.columns();
        if names.len() != self.columns.len()
            || names.iter().zip(&self.columns).any(|(n, c)| n != &c.name)
        {
            return Err(IngestError::SchemaMismatch {
                table: table.to_string(),
                message: format!(
                    "batch columns [{}] do not match declared columns [{}]",
                    names.join(", "),
                    self.column_names().join(", ")
                ),
            });
        }

        batch
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.columns)
                    .map(|(value, column)| column.column_type.coerce(&column.name, value))
                    .collect::<Result<Vec<Value>>>()
            })
            .collect()
    }
}

/// Strip characters the storage layer does not accept in identifiers.
///
/// Whitespace is removed; a name left empty becomes `unnamed_<position>`.
pub fn normalize_column_name(name: &str, position: usize) -> String {
    let normalized: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    if normalized.is_empty() {
        format!("unnamed_{}", position)
    } else {
        normalized
    }
}

pub fn normalize_column_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .enumerate()
        .map(|(position, name)| normalize_column_name(name, position))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_strips_whitespace() {
        let raw = names(&[" station id", "measurement\tdate", "value "]);
        assert_eq!(
            normalize_column_names(&raw),
            names(&["stationid", "measurementdate", "value"])
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = names(&["station_identifier", "measurement date", "  "]);
        let once = normalize_column_names(&raw);
        let twice = normalize_column_names(&once);
        assert_eq!(once, twice);
        assert_eq!(once[2], "unnamed_2");
    }

    #[test]
    fn test_normalize_noop_on_valid_names() {
        let raw = names(&["station", "type"]);
        assert_eq!(normalize_column_names(&raw), raw);
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(
            ColumnType::Date.parse_field("20150101", "%Y%m%d").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap())
        );
        assert_eq!(
            ColumnType::Integer.parse_field(" -42 ", "%Y%m%d").unwrap(),
            Value::Integer(-42)
        );
        assert_eq!(ColumnType::Double.parse_field("", "%Y%m%d").unwrap(), Value::Null);
        assert_eq!(ColumnType::Double.parse_field("  ", "%Y%m%d").unwrap(), Value::Null);
        assert_eq!(
            ColumnType::Text.parse_field(" a b ", "%Y%m%d").unwrap(),
            Value::from(" a b ")
        );
        assert_eq!(ColumnType::Text.parse_field("", "%Y%m%d").unwrap(), Value::Null);
        assert!(ColumnType::Integer.parse_field("1.5", "%Y%m%d").is_err());
        assert!(ColumnType::Date.parse_field("2015-13-01", "%Y-%m-%d").is_err());
    }

    #[test]
    fn test_column_type_from_str() {
        assert_eq!("integer".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("FLOAT".parse::<ColumnType>().unwrap(), ColumnType::Double);
        assert!("blob".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_schema_overrides() {
        let schema = TableSchema::uniform(&names(&["station", "value"]), ColumnType::Text)
            .unwrap()
            .with_override("value", ColumnType::Integer)
            .unwrap();

        assert_eq!(schema.column_type("value"), Some(ColumnType::Integer));
        assert_eq!(schema.column_type("station"), Some(ColumnType::Text));

        let err = schema.with_override("missing", ColumnType::Date).unwrap_err();
        assert!(matches!(err, IngestError::UnknownColumn(_)));
    }

    #[test]
    fn test_schema_rejects_duplicate_columns() {
        let err = TableSchema::uniform(&names(&["a", "a"]), ColumnType::Text).unwrap_err();
        assert!(matches!(err, IngestError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn test_conform_checks_header_and_types() {
        let schema = TableSchema::from_pairs(&[
            ("station", ColumnType::Text),
            ("value", ColumnType::Integer),
        ])
        .unwrap();

        let good = RowBatch::from_rows(
            names(&["station", "value"]),
            vec![vec!["A".into(), Value::Integer(5)], vec!["B".into(), Value::Null]],
        )
        .unwrap();
        assert_eq!(schema.conform("t", &good).unwrap().len(), 2);

        let wrong_header =
            RowBatch::from_rows(names(&["value", "station"]), vec![]).unwrap();
        assert!(matches!(
            schema.conform("t", &wrong_header),
            Err(IngestError::SchemaMismatch { .. })
        ));

        let wrong_type = RowBatch::from_rows(
            names(&["station", "value"]),
            vec![vec!["A".into(), "five".into()]],
        )
        .unwrap();
        assert!(matches!(
            schema.conform("t", &wrong_type),
            Err(IngestError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_integer_column_rejects_out_of_range() {
        let value = Value::Integer(i64::from(i32::MAX) + 1);
        assert!(ColumnType::Integer.coerce("v", &value).is_err());
        assert!(ColumnType::BigInt.coerce("v", &value).is_ok());
    }
}
