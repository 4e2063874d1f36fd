// JSONata-style path expressions
// Author: Gabriel Demetrios Lafis

//! A subset of JSONata: path navigation with implicit mapping over arrays,
//! predicates, operators, constructors and a handful of functions.

use thiserror::Error;

use crate::data::{coerce_string, compare_values, parse_number, values_equal, Map, Value};
use crate::lexer::{tokenize, Token, TokenStream};

const FUNCTIONS: &[&str] = &[
    "sum", "count", "max", "min", "average", "string", "number", "uppercase", "lowercase",
    "length", "join", "keys", "exists",
];

/// Represents an error raised while parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
#[error("JSONata error at position {position}: {message}")]
pub struct JsonataError {
    pub position: usize,
    pub message: String,
}

impl JsonataError {
    fn new<S: Into<String>>(position: usize, message: S) -> Self {
        JsonataError {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    In,
}

impl BinaryOp {
    fn binding_power(&self) -> u8 {
        match self {
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::In => 4,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Concat => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(Value),
    Context,
    Root,
    Field(String),
    Wildcard,
    Path(Box<Node>, Box<Node>),
    /// `[]` without a predicate forces an array
    Filter(Box<Node>, Option<Box<Node>>),
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
        position: usize,
    },
    Negate(Box<Node>, usize),
    Condition {
        test: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    Array(Vec<Node>),
    Object(Vec<(Node, Node)>),
    Call {
        name: String,
        args: Vec<Node>,
        position: usize,
    },
}

// Binding powers of the postfix operators
const CONDITION_BP: u8 = 1;
const PATH_BP: u8 = 7;
const PREDICATE_BP: u8 = 8;

/// Parsed expression ready to evaluate any number of times
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Parse an expression
    pub fn parse(source: &str) -> Result<Self, JsonataError> {
        let tokens = tokenize(source, false).map_err(|e| JsonataError::new(e.position, e.message))?;
        let mut parser = Parser {
            stream: TokenStream::new(tokens, source.len()),
        };

        if parser.stream.is_at_end() {
            return Err(JsonataError::new(0, "empty expression"));
        }

        let root = parser.expression(0)?;
        if !parser.stream.is_at_end() {
            return Err(parser.unexpected());
        }

        Ok(Expression {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against an input value
    pub fn evaluate(&self, input: &Value) -> Result<Value, JsonataError> {
        eval(&self.root, input, input)
    }
}

/// Parse and evaluate an expression in one call
pub fn evaluate(source: &str, input: &Value) -> Result<Value, JsonataError> {
    Expression::parse(source)?.evaluate(input)
}

struct Parser {
    stream: TokenStream,
}

impl Parser {
    fn unexpected(&self) -> JsonataError {
        JsonataError::new(
            self.stream.position(),
            format!("unexpected {}", self.stream.describe_current()),
        )
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), JsonataError> {
        if self.stream.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(JsonataError::new(
                self.stream.position(),
                format!("expected '{}' but found {}", symbol, self.stream.describe_current()),
            ))
        }
    }

    fn infix_operator(&self) -> Option<BinaryOp> {
        match self.stream.peek()? {
            Token::Symbol(symbol) => match *symbol {
                "+" => Some(BinaryOp::Add),
                "-" => Some(BinaryOp::Sub),
                "*" => Some(BinaryOp::Mul),
                "/" => Some(BinaryOp::Div),
                "%" => Some(BinaryOp::Mod),
                "&" => Some(BinaryOp::Concat),
                "=" | "==" => Some(BinaryOp::Eq),
                "!=" => Some(BinaryOp::Ne),
                "<" => Some(BinaryOp::Lt),
                "<=" => Some(BinaryOp::Le),
                ">" => Some(BinaryOp::Gt),
                ">=" => Some(BinaryOp::Ge),
                _ => None,
            },
            Token::Ident(name) => match name.as_str() {
                "and" => Some(BinaryOp::And),
                "or" => Some(BinaryOp::Or),
                "in" => Some(BinaryOp::In),
                _ => None,
            },
            _ => None,
        }
    }

    fn expression(&mut self, min_bp: u8) -> Result<Node, JsonataError> {
        let mut left = self.prefix()?;

        loop {
            let position = self.stream.position();

            if self.stream.is_symbol(".") {
                if PATH_BP < min_bp {
                    break;
                }
                self.stream.next();
                let right = self.expression(PATH_BP + 1)?;
                left = Node::Path(Box::new(left), Box::new(right));
            } else if self.stream.is_symbol("[") {
                if PREDICATE_BP < min_bp {
                    break;
                }
                self.stream.next();
                if self.stream.eat_symbol("]") {
                    left = Node::Filter(Box::new(left), None);
                } else {
                    let predicate = self.expression(0)?;
                    self.expect_symbol("]")?;
                    left = Node::Filter(Box::new(left), Some(Box::new(predicate)));
                }
            } else if self.stream.is_symbol("?") {
                if CONDITION_BP < min_bp {
                    break;
                }
                self.stream.next();
                let then = self.expression(0)?;
                let otherwise = if self.stream.eat_symbol(":") {
                    Some(Box::new(self.expression(CONDITION_BP)?))
                } else {
                    None
                };
                left = Node::Condition {
                    test: Box::new(left),
                    then: Box::new(then),
                    otherwise,
                };
            } else if let Some(op) = self.infix_operator() {
                let bp = op.binding_power();
                if bp < min_bp {
                    break;
                }
                self.stream.next();
                let right = self.expression(bp + 1)?;
                left = Node::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    position,
                };
            } else {
                break;
            }
        }

        Ok(left)
    }

    fn prefix(&mut self) -> Result<Node, JsonataError> {
        let position = self.stream.position();
        let token = match self.stream.next() {
            Some(token) => token,
            None => return Err(JsonataError::new(position, "unexpected end of expression")),
        };

        match token {
            Token::Number(n) => Ok(Node::Literal(Value::Number(n))),
            Token::Quoted(text) | Token::SingleQuoted(text) => Ok(Node::Literal(Value::String(text))),
            Token::Backtick(name) => Ok(Node::Field(name)),
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => Node::Literal(Value::Bool(true)),
                "false" => Node::Literal(Value::Bool(false)),
                "null" => Node::Literal(Value::Null),
                _ => Node::Field(name),
            }),
            Token::Variable(name) if name.is_empty() => Ok(Node::Context),
            Token::Variable(name) if name == "$" => Ok(Node::Root),
            Token::Variable(name) => {
                if !self.stream.is_symbol("(") {
                    return Err(JsonataError::new(position, format!("unknown variable ${}", name)));
                }
                if !FUNCTIONS.contains(&name.as_str()) {
                    return Err(JsonataError::new(position, format!("unknown function ${}", name)));
                }
                self.stream.next();
                let args = self.list(")")?;
                Ok(Node::Call { name, args, position })
            }
            Token::Symbol("(") => {
                let inner = self.expression(0)?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Token::Symbol("[") => Ok(Node::Array(self.list("]")?)),
            Token::Symbol("{") => {
                let mut entries = Vec::new();
                if !self.stream.eat_symbol("}") {
                    loop {
                        let key = self.expression(0)?;
                        self.expect_symbol(":")?;
                        let value = self.expression(0)?;
                        entries.push((key, value));
                        if self.stream.eat_symbol("}") {
                            break;
                        }
                        self.expect_symbol(",")?;
                    }
                }
                Ok(Node::Object(entries))
            }
            Token::Symbol("*") => Ok(Node::Wildcard),
            Token::Symbol("-") => {
                let operand = self.expression(PATH_BP)?;
                Ok(Node::Negate(Box::new(operand), position))
            }
            other => Err(JsonataError::new(position, format!("unexpected {}", other.describe()))),
        }
    }

    /// Comma-separated expressions up to the closing symbol
    fn list(&mut self, close: &str) -> Result<Vec<Node>, JsonataError> {
        let mut items = Vec::new();
        if self.stream.eat_symbol(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression(0)?);
            if self.stream.eat_symbol(close) {
                return Ok(items);
            }
            self.expect_symbol(",")?;
        }
    }
}

/// Values of a sequence; null is the empty sequence
fn sequence(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Collapse a result sequence: empty is null, a singleton is its item
fn collapse(mut items: Vec<Value>) -> Value {
    match items.len() {
        0 => Value::Null,
        1 => items.remove(0),
        _ => Value::Array(items),
    }
}

fn push_flattened(results: &mut Vec<Value>, value: Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => results.extend(items),
        other => results.push(other),
    }
}

fn field_of(input: &Value, name: &str) -> Value {
    match input {
        Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
        Value::Array(items) => {
            let mut results = Vec::new();
            for item in items {
                push_flattened(&mut results, field_of(item, name));
            }
            collapse(results)
        }
        _ => Value::Null,
    }
}

fn wildcard(input: &Value) -> Value {
    let mut results = Vec::new();
    match input {
        Value::Object(map) => {
            for value in map.values() {
                push_flattened(&mut results, value.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                push_flattened(&mut results, wildcard(item));
            }
        }
        _ => {}
    }
    collapse(results)
}

fn eval(node: &Node, input: &Value, root: &Value) -> Result<Value, JsonataError> {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Context => Ok(input.clone()),
        Node::Root => Ok(root.clone()),
        Node::Field(name) => Ok(field_of(input, name)),
        Node::Wildcard => Ok(wildcard(input)),
        Node::Path(left, right) => match eval(left, input, root)? {
            Value::Array(items) => {
                let mut results = Vec::new();
                for item in &items {
                    push_flattened(&mut results, eval(right, item, root)?);
                }
                Ok(collapse(results))
            }
            Value::Null => Ok(Value::Null),
            value => eval(right, &value, root),
        },
        Node::Filter(left, predicate) => {
            let items = sequence(eval(left, input, root)?);
            let predicate = match predicate {
                Some(predicate) => predicate,
                None => return Ok(Value::Array(items)),
            };

            let len = items.len() as i64;
            let mut kept = Vec::new();
            for (index, item) in items.into_iter().enumerate() {
                let keep = match eval(predicate, &item, root)? {
                    Value::Number(n) => {
                        let wanted = n.floor() as i64;
                        let wanted = if wanted < 0 { len + wanted } else { wanted };
                        wanted == index as i64
                    }
                    other => other.is_truthy(),
                };
                if keep {
                    kept.push(item);
                }
            }
            Ok(collapse(kept))
        }
        Node::Binary { op, left, right, position } => {
            let left = eval(left, input, root)?;
            match op {
                BinaryOp::And if !left.is_truthy() => return Ok(Value::Bool(false)),
                BinaryOp::Or if left.is_truthy() => return Ok(Value::Bool(true)),
                _ => {}
            }
            let right = eval(right, input, root)?;
            binary(*op, &left, &right, *position)
        }
        Node::Negate(operand, position) => match eval(operand, input, root)? {
            Value::Null => Ok(Value::Null),
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(JsonataError::new(
                *position,
                format!("cannot negate a {}", other.type_name()),
            )),
        },
        Node::Condition { test, then, otherwise } => {
            if eval(test, input, root)?.is_truthy() {
                eval(then, input, root)
            } else {
                match otherwise {
                    Some(otherwise) => eval(otherwise, input, root),
                    None => Ok(Value::Null),
                }
            }
        }
        Node::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                let value = eval(item, input, root)?;
                if !value.is_null() {
                    values.push(value);
                }
            }
            Ok(Value::Array(values))
        }
        Node::Object(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                let key = eval(key, input, root)?.to_text();
                let value = eval(value, input, root)?;
                if !value.is_null() {
                    map.insert(key, value);
                }
            }
            Ok(Value::Object(map))
        }
        Node::Call { name, args, position } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, input, root)?);
            }
            call(name, values, input, *position)
        }
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value, position: usize) -> Result<Value, JsonataError> {
    use std::cmp::Ordering;

    let ordering = |wanted: &[Ordering]| -> Value {
        Value::Bool(compare_values(left, right).map_or(false, |o| wanted.contains(&o)))
    };

    Ok(match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let (a, b) = match (left, right) {
                (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
                (Value::Number(a), Value::Number(b)) => (*a, *b),
                _ => {
                    return Err(JsonataError::new(
                        position,
                        format!(
                            "arithmetic on {} and {}",
                            left.type_name(),
                            right.type_name()
                        ),
                    ))
                }
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            };
            if !result.is_finite() {
                return Err(JsonataError::new(position, "arithmetic result is not finite"));
            }
            Value::Number(result)
        }
        BinaryOp::Concat => Value::String(format!("{}{}", left.to_text(), right.to_text())),
        BinaryOp::Eq => Value::Bool(!left.is_null() && values_equal(left, right)),
        BinaryOp::Ne => Value::Bool(!left.is_null() && !right.is_null() && !values_equal(left, right)),
        BinaryOp::Lt => ordering(&[Ordering::Less]),
        BinaryOp::Le => ordering(&[Ordering::Less, Ordering::Equal]),
        BinaryOp::Gt => ordering(&[Ordering::Greater]),
        BinaryOp::Ge => ordering(&[Ordering::Greater, Ordering::Equal]),
        BinaryOp::And | BinaryOp::Or => Value::Bool(right.is_truthy()),
        BinaryOp::In => Value::Bool(match right {
            Value::Array(items) => items.iter().any(|item| values_equal(left, item)),
            other => values_equal(left, other),
        }),
    })
}

fn numbers(value: Value, function: &str, position: usize) -> Result<Vec<f64>, JsonataError> {
    sequence(value)
        .iter()
        .map(|item| {
            item.as_f64().ok_or_else(|| {
                JsonataError::new(
                    position,
                    format!("${} expects numbers, found {}", function, item.type_name()),
                )
            })
        })
        .collect()
}

fn call(name: &str, args: Vec<Value>, input: &Value, position: usize) -> Result<Value, JsonataError> {
    let mut args = args.into_iter();
    // Context-aware functions fall back to the input when called without arguments
    let first = args.next().unwrap_or_else(|| input.clone());

    let result = match name {
        "sum" => Value::Number(numbers(first, name, position)?.iter().sum()),
        "count" => Value::from(sequence(first).len() as i64),
        "max" => numbers(first, name, position)?
            .into_iter()
            .reduce(f64::max)
            .map_or(Value::Null, Value::Number),
        "min" => numbers(first, name, position)?
            .into_iter()
            .reduce(f64::min)
            .map_or(Value::Null, Value::Number),
        "average" => {
            let values = numbers(first, name, position)?;
            if values.is_empty() {
                Value::Null
            } else {
                Value::Number(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        "string" => match first {
            Value::Null => Value::Null,
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_text()),
        },
        "number" => match &first {
            Value::Null => Value::Null,
            Value::Number(_) => first,
            Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => match parse_number(s) {
                Some(n) => Value::Number(n),
                None => {
                    return Err(JsonataError::new(
                        position,
                        format!("unable to cast '{}' to a number", s),
                    ))
                }
            },
            other => {
                return Err(JsonataError::new(
                    position,
                    format!("unable to cast a {} to a number", other.type_name()),
                ))
            }
        },
        "uppercase" => coerce_string(&first).map_or(Value::Null, |s| Value::String(s.to_uppercase())),
        "lowercase" => coerce_string(&first).map_or(Value::Null, |s| Value::String(s.to_lowercase())),
        "length" => match &first {
            Value::Null => Value::Null,
            Value::String(s) => Value::from(s.chars().count() as i64),
            other => {
                return Err(JsonataError::new(
                    position,
                    format!("$length expects a string, found {}", other.type_name()),
                ))
            }
        },
        "join" => {
            let separator = args.next().map(|s| s.to_text()).unwrap_or_default();
            let parts: Vec<String> = sequence(first).iter().map(Value::to_text).collect();
            Value::String(parts.join(&separator))
        }
        "keys" => {
            let mut keys: Vec<String> = Vec::new();
            for item in sequence(first) {
                if let Value::Object(map) = item {
                    for key in map.keys() {
                        if !keys.contains(key) {
                            keys.push(key.clone());
                        }
                    }
                }
            }
            collapse(keys.into_iter().map(Value::String).collect())
        }
        "exists" => Value::Bool(!first.is_null()),
        _ => return Err(JsonataError::new(position, format!("unknown function ${}", name))),
    };

    Ok(result)
}
