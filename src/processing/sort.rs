// Ordering of records
// Author: Gabriel Demetrios Lafis

use std::cmp::Ordering;

use crate::data::{parse_path, resolve_segments, sort_order, PathSegment, Value};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// One key of an `order by` clause
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
    segments: Vec<PathSegment>,
}

impl SortKey {
    pub fn new(field: &str, direction: Direction) -> Self {
        SortKey {
            field: field.to_string(),
            direction,
            segments: parse_path(field),
        }
    }

    fn value<'a>(&self, record: &'a Value) -> &'a Value {
        resolve_segments(record, &self.segments).unwrap_or(&Value::Null)
    }
}

/// Stable sort of records by the given keys.
///
/// Nulls and missing fields sort last whatever the direction.
pub fn order_by(mut rows: Vec<Value>, keys: &[SortKey]) -> Vec<Value> {
    rows.sort_by(|a, b| compare_records(a, b, keys));
    rows
}

fn compare_records(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let (x, y) = (key.value(a), key.value(b));
        let ordering = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match key.direction {
                Direction::Ascending => sort_order(x, y),
                Direction::Descending => sort_order(y, x),
            },
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
