// GROQ module for filtering and projecting datasets
// Author: Gabriel Demetrios Lafis

mod eval;
mod parser;

pub use parser::*;

use thiserror::Error;

use crate::data::{PathSegment, Value};
use crate::processing::Direction;

/// Represents a malformed GROQ query
#[derive(Debug, Clone, PartialEq, Error)]
#[error("GROQ syntax error at position {position}: {message}")]
pub struct GroqSyntaxError {
    pub position: usize,
    pub message: String,
}

/// Parsed query: `*` followed by segments applied left to right
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub segments: Vec<Segment>,
}

/// One step of a query
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Filter(GroqExpr),
    Index(i64),
    Slice { start: i64, end: i64, inclusive: bool },
    Projection(Vec<ProjectionField>),
    Order(Vec<(Vec<PathSegment>, Direction)>),
}

/// One entry of a projection
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionField {
    /// `...` copies every attribute
    Spread,
    Field { name: String, value: GroqExpr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroqOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// Expression inside filters and projections
#[derive(Debug, Clone, PartialEq)]
pub enum GroqExpr {
    Literal(Value),
    /// Attribute path relative to the current element; empty is `@`
    Path(Vec<PathSegment>),
    Array(Vec<GroqExpr>),
    Compare(GroqOp, Box<GroqExpr>, Box<GroqExpr>),
    In(Box<GroqExpr>, Box<GroqExpr>),
    And(Box<GroqExpr>, Box<GroqExpr>),
    Or(Box<GroqExpr>, Box<GroqExpr>),
    Not(Box<GroqExpr>),
    Defined(Box<GroqExpr>),
}

/// Parse and evaluate a query against a dataset
pub fn evaluate(query: &str, dataset: &Value) -> Result<Value, GroqSyntaxError> {
    let query = parse_query(query)?;
    Ok(query.evaluate(dataset))
}
