// Table assembly from rows and column specs
// Author: Gabriel Demetrios Lafis

use crate::data::{coerce, parse_path, resolve_segments, ColumnFormat, Value, Warnings};

use super::{ColumnSpec, Frame, FrameColumn, Row};

/// Build a frame from rows using the declared columns.
///
/// When `columns` is empty the columns are derived from the first row; later
/// rows never introduce new columns.
pub fn to_table(rows: &[Value], columns: &[ColumnSpec], warnings: &mut Warnings) -> Frame {
    let derived;
    let columns: &[ColumnSpec] = if columns.is_empty() {
        derived = derive_columns(rows);
        &derived
    } else {
        columns
    };

    let frame_columns = columns
        .iter()
        .map(|column| FrameColumn {
            name: column.name().to_string(),
            column_type: column.format.column_type(),
        })
        .collect();

    let mut frame = Frame::new("", frame_columns);
    let paths: Vec<_> = columns.iter().map(|c| parse_path(&c.selector)).collect();
    let mut failures = vec![0usize; columns.len()];

    for row in rows {
        let cells = columns
            .iter()
            .zip(&paths)
            .enumerate()
            .map(|(i, (column, path))| {
                let raw = resolve_segments(row, path).unwrap_or(&Value::Null);
                let cell = coerce(raw, column.format, column.timestamp_pattern.as_deref());
                if cell.is_null() && !is_blank(raw) {
                    failures[i] += 1;
                }
                cell
            })
            .collect();

        frame.rows.push(Row::new(cells));
    }

    for (column, count) in columns.iter().zip(failures) {
        if count > 0 {
            warnings.push(format!(
                "column '{}': {} value(s) could not be converted to {:?}",
                column.name(),
                count,
                column.format
            ));
        }
    }

    log::debug!("assembled table with {} columns and {} rows", frame.columns.len(), frame.len());

    frame
}

/// Derive column specs from the first row
pub fn derive_columns(rows: &[Value]) -> Vec<ColumnSpec> {
    match rows.first() {
        None => Vec::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| ColumnSpec::new(&key_selector(key), key, inferred_format(value)))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let index = i.to_string();
                ColumnSpec::new(&index, &index, inferred_format(value))
            })
            .collect(),
        Some(scalar) => vec![ColumnSpec::new("", "value", inferred_format(scalar))],
    }
}

fn inferred_format(value: &Value) -> ColumnFormat {
    match value {
        Value::Number(_) => ColumnFormat::Number,
        _ => ColumnFormat::String,
    }
}

/// Selector addressing a key literally, even when it contains path characters
fn key_selector(key: &str) -> String {
    if key.contains(|c: char| c == '.' || c == '[' || c == ']') || key.starts_with('$') {
        format!("['{}']", key)
    } else {
        key.to_string()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
