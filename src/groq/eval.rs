// GROQ query evaluation
// Author: Gabriel Demetrios Lafis

use std::cmp::Ordering;

use crate::data::{compare_values, resolve_segments, sort_order, values_equal, Map, Value};
use crate::processing::Direction;

use super::{GroqExpr, GroqOp, ProjectionField, Query, Segment};

/// Intermediate result: an iterated collection or a single value
enum Current {
    Many(Vec<Value>),
    One(Value),
}

impl Query {
    /// Evaluate the query against a dataset
    pub fn evaluate(&self, dataset: &Value) -> Value {
        let mut current = everything(dataset);

        for segment in &self.segments {
            current = apply(segment, current);
        }

        match current {
            Current::Many(items) => Value::Array(items),
            Current::One(value) => value,
        }
    }
}

/// `*`: arrays iterate their elements, objects iterate the elements of the
/// arrays they contain, anything else passes through
fn everything(dataset: &Value) -> Current {
    match dataset {
        Value::Array(items) => Current::Many(items.clone()),
        Value::Object(map) => {
            let nested: Vec<Value> = map
                .values()
                .filter_map(Value::as_array)
                .flat_map(|items| items.iter().cloned())
                .collect();
            if map.values().any(|value| matches!(value, Value::Array(_))) {
                Current::Many(nested)
            } else {
                Current::One(dataset.clone())
            }
        }
        other => Current::One(other.clone()),
    }
}

fn apply(segment: &Segment, current: Current) -> Current {
    match (segment, current) {
        (Segment::Filter(expr), Current::Many(items)) => {
            Current::Many(items.into_iter().filter(|item| expr.eval(item).is_truthy()).collect())
        }
        (Segment::Filter(expr), Current::One(value)) => {
            if expr.eval(&value).is_truthy() {
                Current::One(value)
            } else {
                Current::One(Value::Null)
            }
        }
        (Segment::Index(index), Current::Many(items)) => {
            Current::One(resolve_index(items.len(), *index).and_then(|i| items.into_iter().nth(i)).unwrap_or(Value::Null))
        }
        (Segment::Slice { start, end, inclusive }, Current::Many(items)) => {
            let len = items.len();
            let from = clamp_index(len, *start);
            let to = clamp_index(len, *end) + usize::from(*inclusive && resolve_index(len, *end).is_some());
            Current::Many(items.into_iter().skip(from).take(to.saturating_sub(from)).collect())
        }
        (Segment::Index(_), Current::One(_)) | (Segment::Slice { .. }, Current::One(_)) => {
            Current::One(Value::Null)
        }
        (Segment::Projection(fields), Current::Many(items)) => {
            Current::Many(items.iter().map(|item| project(item, fields)).collect())
        }
        (Segment::Projection(fields), Current::One(value)) => match value {
            Value::Null => Current::One(Value::Null),
            value => Current::One(project(&value, fields)),
        },
        (Segment::Order(keys), Current::Many(mut items)) => {
            items.sort_by(|a, b| {
                for (path, direction) in keys {
                    let x = resolve_segments(a, path).unwrap_or(&Value::Null);
                    let y = resolve_segments(b, path).unwrap_or(&Value::Null);
                    let ordering = match (direction, x.is_null() || y.is_null()) {
                        (_, true) => sort_order(x, y),
                        (Direction::Ascending, false) => sort_order(x, y),
                        (Direction::Descending, false) => sort_order(y, x),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
            Current::Many(items)
        }
        (Segment::Order(_), one) => one,
    }
}

/// Position of an index counted from the end when negative
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    if resolved >= 0 && (resolved as usize) < len {
        Some(resolved as usize)
    } else {
        None
    }
}

fn clamp_index(len: usize, index: i64) -> usize {
    let resolved = if index < 0 { len as i64 + index } else { index };
    resolved.clamp(0, len as i64) as usize
}

fn project(item: &Value, fields: &[ProjectionField]) -> Value {
    let mut map = Map::new();

    for field in fields {
        match field {
            ProjectionField::Spread => {
                if let Value::Object(source) = item {
                    for (key, value) in source {
                        map.insert(key.clone(), value.clone());
                    }
                }
            }
            ProjectionField::Field { name, value } => {
                map.insert(name.clone(), value.eval(item));
            }
        }
    }

    Value::Object(map)
}

impl GroqExpr {
    /// Evaluate the expression against one element
    pub fn eval(&self, item: &Value) -> Value {
        match self {
            GroqExpr::Literal(value) => value.clone(),
            GroqExpr::Path(path) => resolve_segments(item, path).cloned().unwrap_or(Value::Null),
            GroqExpr::Array(items) => Value::Array(items.iter().map(|e| e.eval(item)).collect()),
            GroqExpr::Compare(op, left, right) => {
                let (left, right) = (left.eval(item), right.eval(item));
                // Comparisons involving null are false except equality of two nulls
                Value::Bool(match op {
                    GroqOp::Eq => values_equal(&left, &right),
                    GroqOp::Ne => !values_equal(&left, &right),
                    _ if left.is_null() || right.is_null() => false,
                    GroqOp::Gt => compare_values(&left, &right) == Some(Ordering::Greater),
                    GroqOp::Ge => matches!(compare_values(&left, &right), Some(Ordering::Greater | Ordering::Equal)),
                    GroqOp::Lt => compare_values(&left, &right) == Some(Ordering::Less),
                    GroqOp::Le => matches!(compare_values(&left, &right), Some(Ordering::Less | Ordering::Equal)),
                })
            }
            GroqExpr::In(needle, haystack) => {
                let needle = needle.eval(item);
                Value::Bool(match haystack.eval(item) {
                    Value::Array(items) => items.iter().any(|candidate| values_equal(&needle, candidate)),
                    Value::String(text) => needle.as_str().map_or(false, |n| text.contains(n)),
                    _ => false,
                })
            }
            GroqExpr::And(a, b) => Value::Bool(a.eval(item).is_truthy() && b.eval(item).is_truthy()),
            GroqExpr::Or(a, b) => Value::Bool(a.eval(item).is_truthy() || b.eval(item).is_truthy()),
            GroqExpr::Not(inner) => Value::Bool(!inner.eval(item).is_truthy()),
            GroqExpr::Defined(inner) => Value::Bool(!inner.eval(item).is_null()),
        }
    }
}
