// Value comparison shared by predicates and sorting
// Author: Gabriel Demetrios Lafis

use std::cmp::Ordering;

use super::{parse_number, Value};

/// Compare two values for predicates.
///
/// Numbers compare numerically, a number against a numeric string compares
/// numerically, strings compare lexically. Incomparable pairs give `None`.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::Number(x), Value::String(s)) => x.partial_cmp(&parse_number(s)?),
        (Value::String(s), Value::Number(y)) => parse_number(s)?.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality used by `==` style operators
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match compare_values(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

/// Total order used for sorting; nulls sort after every other value
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::String(x), Value::String(y)) => match (parse_number(x), parse_number(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => x.cmp(y),
        },
        _ => match compare_values(a, b) {
            Some(ordering) => ordering,
            None => type_rank(a)
                .cmp(&type_rank(b))
                .then_with(|| a.to_json_string().cmp(&b.to_json_string())),
        },
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::String(_) => 1,
        Value::Bool(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
        Value::Null => 5,
    }
}
