// Record transforms: project, project-away, extend and mv-expand
// Author: Gabriel Demetrios Lafis

use crate::data::{parse_path, resolve_segments, Map, PathSegment, Value};

use super::{kv, Assignment, Expr, Function};

/// Keep only the listed expressions of a record.
///
/// A lone unaliased `kv()` replaces the record with its key/value entries.
pub fn project(record: Value, assignments: &[Assignment]) -> Result<Value, String> {
    if !matches!(record, Value::Object(_)) {
        return Err(format!("project expects records, found {}", record.type_name()));
    }

    if let [Assignment {
        name,
        expr: Expr::Call {
            function: Function::Kv,
            args,
        },
    }] = assignments
    {
        if args.is_empty() && name == Function::Kv.name() {
            return Ok(kv(&record));
        }
    }

    let projected: Map = assignments
        .iter()
        .map(|assignment| (assignment.name.clone(), assignment.expr.eval(&record)))
        .collect();
    Ok(Value::Object(projected))
}

/// Remove top-level keys from a record; non-records pass through
pub fn project_away(record: Value, fields: &[String]) -> Value {
    match record {
        Value::Object(mut map) => {
            for field in fields {
                map.shift_remove(field);
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Add or overwrite fields; existing keys keep their position
pub fn extend(record: Value, assignments: &[Assignment]) -> Result<Value, String> {
    let mut record = match record {
        Value::Object(_) => record,
        other => return Err(format!("extend expects records, found {}", other.type_name())),
    };

    // Later assignments see the fields added by earlier ones
    for assignment in assignments {
        let value = assignment.expr.eval(&record);
        if let Value::Object(map) = &mut record {
            map.insert(assignment.name.clone(), value);
        }
    }

    Ok(record)
}

/// Emit one record per element of an array field.
///
/// Records whose field is not an array pass through; an empty array emits no record.
pub fn mv_expand(rows: Vec<Value>, field: &str) -> Result<Vec<Value>, String> {
    let segments = parse_path(field);
    if segments.is_empty() {
        return Err("mv-expand needs a field".to_string());
    }

    let mut expanded = Vec::with_capacity(rows.len());

    for row in rows {
        if !matches!(row, Value::Object(_)) {
            return Err(format!("mv-expand expects records, found {}", row.type_name()));
        }

        let items = match resolve_segments(&row, &segments) {
            Some(Value::Array(items)) => items.clone(),
            _ => {
                expanded.push(row);
                continue;
            }
        };

        for item in items {
            let mut copy = row.clone();
            set_path(&mut copy, &segments, item);
            expanded.push(copy);
        }
    }

    log::debug!("mv-expand on '{}' produced {} rows", field, expanded.len());
    Ok(expanded)
}

/// Replace the value at an existing path
fn set_path(target: &mut Value, segments: &[PathSegment], value: Value) {
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = target;
    for segment in parents {
        current = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => match map.get_mut(key) {
                Some(next) => next,
                None => return,
            },
            (Value::Array(items), PathSegment::Index(index)) => match items.get_mut(*index) {
                Some(next) => next,
                None => return,
            },
            _ => return,
        };
    }

    match (current, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value);
        }
        (Value::Array(items), PathSegment::Index(index)) if *index < items.len() => {
            items[*index] = value;
        }
        _ => {}
    }
}
