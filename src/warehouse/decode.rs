//! Decoding of BigQuery wire rows into typed values.
//!
//! BigQuery sends every scalar as a JSON string; the schema decides how it
//! is read back. RECORD cells nest another `{"f": [...]}` row and REPEATED
//! cells are arrays of `{"v": ...}` wrappers.

use super::types::{ColumnInfo, Row, Value};
use super::wire::{TableCell, TableFieldSchema, TableRow};
use crate::error::{ReportError, Result};

/// Converts schema fields into the column metadata of a Result Table.
pub fn columns_from_schema(fields: &[TableFieldSchema]) -> Vec<ColumnInfo> {
    fields
        .iter()
        .map(|field| ColumnInfo {
            name: field.name.clone(),
            data_type: field.field_type.to_uppercase(),
            mode: field.mode().to_uppercase(),
        })
        .collect()
}

/// Decodes one wire row against the top-level schema.
///
/// Cells missing from the end of the row decode as NULL.
pub fn decode_row(fields: &[TableFieldSchema], row: TableRow) -> Result<Row> {
    if row.fields.len() > fields.len() {
        return Err(ReportError::query(format!(
            "Row has {} cells but the schema has {} columns",
            row.fields.len(),
            fields.len()
        )));
    }

    let mut cells = row.fields.into_iter();
    fields
        .iter()
        .map(|field| match cells.next() {
            Some(cell) => decode_cell(field, cell.value),
            None => Ok(Value::Null),
        })
        .collect()
}

fn decode_cell(field: &TableFieldSchema, raw: serde_json::Value) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    if field.is_repeated() {
        let serde_json::Value::Array(items) = raw else {
            return Err(mismatch(field, "array", &raw));
        };
        return items
            .into_iter()
            .map(|item| {
                let cell: TableCell = serde_json::from_value(item).map_err(|e| {
                    ReportError::query(format!(
                        "Column '{}': malformed array element: {e}",
                        field.name
                    ))
                })?;
                if cell.value.is_null() {
                    Ok(Value::Null)
                } else {
                    decode_scalar(field, cell.value)
                }
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array);
    }

    decode_scalar(field, raw)
}

fn decode_scalar(field: &TableFieldSchema, raw: serde_json::Value) -> Result<Value> {
    match field.field_type.to_uppercase().as_str() {
        "RECORD" | "STRUCT" => {
            let row: TableRow = serde_json::from_value(raw).map_err(|e| {
                ReportError::query(format!("Column '{}': malformed record: {e}", field.name))
            })?;
            let values = decode_row(&field.fields, row)?;
            Ok(Value::Record(
                field
                    .fields
                    .iter()
                    .map(|f| f.name.clone())
                    .zip(values)
                    .collect(),
            ))
        }
        "INTEGER" | "INT64" => {
            let text = as_text(field, &raw)?;
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| mismatch(field, "integer", &raw))
        }
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" | "DECIMAL" | "BIGDECIMAL" => {
            let text = as_text(field, &raw)?;
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| mismatch(field, "number", &raw))
        }
        "BOOLEAN" | "BOOL" => match as_text(field, &raw)?.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch(field, "boolean", &raw)),
        },
        "TIMESTAMP" => parse_timestamp_millis(as_text(field, &raw)?)
            .map(Value::Int)
            .ok_or_else(|| mismatch(field, "timestamp", &raw)),
        _ => match raw {
            serde_json::Value::String(s) => Ok(Value::String(s)),
            other => Ok(Value::String(other.to_string())),
        },
    }
}

/// Parses a BigQuery TIMESTAMP cell into epoch milliseconds.
///
/// Accepts integer epoch microseconds (`useInt64Timestamp`) and the legacy
/// float-seconds form such as `1.6488238411870E9`.
pub fn parse_timestamp_millis(text: &str) -> Option<i64> {
    if let Ok(micros) = text.parse::<i64>() {
        return Some(micros.div_euclid(1000));
    }
    let seconds = text.parse::<f64>().ok().filter(|s| s.is_finite())?;
    Some((seconds * 1000.0).round() as i64)
}

fn as_text<'a>(field: &TableFieldSchema, raw: &'a serde_json::Value) -> Result<&'a str> {
    raw.as_str().ok_or_else(|| mismatch(field, "string-encoded scalar", raw))
}

fn mismatch(field: &TableFieldSchema, expected: &str, found: &serde_json::Value) -> ReportError {
    ReportError::query(format!(
        "Column '{}' ({}): expected {} value, found {}",
        field.name, field.field_type, expected, found
    ))
}
