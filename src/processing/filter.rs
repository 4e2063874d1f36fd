// Filter predicates for the where verb
// Author: Gabriel Demetrios Lafis

use std::cmp::Ordering;

use crate::data::{coerce_string, compare_values, values_equal, Value};

use super::Expr;

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Case-insensitive substring, or membership for arrays
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" | "=" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            _ => None,
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_lowercase().as_str() {
            "contains" => Some(CompareOp::Contains),
            "startswith" => Some(CompareOp::StartsWith),
            "endswith" => Some(CompareOp::EndsWith),
            _ => None,
        }
    }

    fn test(&self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Eq => values_equal(left, right),
            CompareOp::Ne => !values_equal(left, right),
            CompareOp::Gt => compare_values(left, right) == Some(Ordering::Greater),
            CompareOp::Ge => matches!(compare_values(left, right), Some(Ordering::Greater | Ordering::Equal)),
            CompareOp::Lt => compare_values(left, right) == Some(Ordering::Less),
            CompareOp::Le => matches!(compare_values(left, right), Some(Ordering::Less | Ordering::Equal)),
            CompareOp::Contains => match left {
                Value::Array(items) => items.iter().any(|item| values_equal(item, right)),
                _ => text_test(left, right, |l, r| l.contains(r)),
            },
            CompareOp::StartsWith => text_test(left, right, |l, r| l.starts_with(r)),
            CompareOp::EndsWith => text_test(left, right, |l, r| l.ends_with(r)),
        }
    }
}

fn text_test<F: Fn(&str, &str) -> bool>(left: &Value, right: &Value, f: F) -> bool {
    match (coerce_string(left), coerce_string(right)) {
        (Some(l), Some(r)) => f(&l.to_lowercase(), &r.to_lowercase()),
        _ => false,
    }
}

/// Boolean condition over one record
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare { left: Expr, op: CompareOp, right: Expr },
    In { expr: Expr, list: Vec<Expr>, negated: bool },
    /// Bare expression tested for truthiness
    Truthy(Expr),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluate the predicate against a record
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Predicate::Compare { left, op, right } => op.test(&left.eval(record), &right.eval(record)),
            Predicate::In { expr, list, negated } => {
                let value = expr.eval(record);
                let found = list.iter().any(|item| values_equal(&value, &item.eval(record)));
                found != *negated
            }
            Predicate::Truthy(expr) => expr.eval(record).is_truthy(),
            Predicate::And(a, b) => a.matches(record) && b.matches(record),
            Predicate::Or(a, b) => a.matches(record) || b.matches(record),
            Predicate::Not(inner) => !inner.matches(record),
        }
    }
}

/// Keep the rows matching the predicate
pub fn filter_rows(rows: Vec<Value>, predicate: &Predicate) -> Vec<Value> {
    let before = rows.len();
    let kept: Vec<Value> = rows.into_iter().filter(|row| predicate.matches(row)).collect();
    log::debug!("where kept {} of {} rows", kept.len(), before);
    kept
}
