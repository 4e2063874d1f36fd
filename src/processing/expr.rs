// Scalar expressions and functions used by project, extend and where
// Author: Gabriel Demetrios Lafis

use crate::data::{
    coerce_number, coerce_string, coerce_timestamp, format_timestamp, from_epoch_millis,
    from_epoch_seconds, parse_path, resolve_segments, ColumnFormat, Map, PathSegment, Value,
};

/// Expression evaluated against one record
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Field { path: String, segments: Vec<PathSegment> },
    Call { function: Function, args: Vec<Expr> },
}

impl Expr {
    /// Field reference from a selector path
    pub fn field(path: &str) -> Self {
        Expr::Field {
            path: path.to_string(),
            segments: parse_path(path),
        }
    }

    /// Output name used when the expression carries no alias
    pub fn default_name(&self) -> String {
        match self {
            Expr::Literal(value) => value.to_text(),
            Expr::Field { path, .. } => path.clone(),
            Expr::Call { function, .. } => function.name().to_string(),
        }
    }

    /// Evaluate the expression against a record
    pub fn eval(&self, record: &Value) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Field { segments, .. } => {
                resolve_segments(record, segments).cloned().unwrap_or(Value::Null)
            }
            Expr::Call { function, args } => {
                let args: Vec<Value> = args.iter().map(|arg| arg.eval(record)).collect();
                function.call(&args, record)
            }
        }
    }
}

/// Output name bound to an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub expr: Expr,
}

impl Assignment {
    pub fn new(name: &str, expr: Expr) -> Self {
        Assignment {
            name: name.to_string(),
            expr,
        }
    }

    /// Assignment named after its expression
    pub fn unnamed(expr: Expr) -> Self {
        Assignment {
            name: expr.default_name(),
            expr,
        }
    }
}

/// Scalar functions available in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    StrCat,
    ToUpper,
    ToLower,
    Trim,
    LTrim,
    RTrim,
    StrLen,
    Substring,
    Split,
    ToString,
    Sum,
    Mul,
    Diff,
    Div,
    ToLong,
    ToDouble,
    Floor,
    Ceil,
    Round,
    ToDateTime,
    UnixtimeSecondsToDateTime,
    UnixtimeMillisecondsToDateTime,
    ArrayToMap,
    ArrayFromEntries,
    Kv,
}

const FUNCTIONS: &[Function] = &[
    Function::StrCat,
    Function::ToUpper,
    Function::ToLower,
    Function::Trim,
    Function::LTrim,
    Function::RTrim,
    Function::StrLen,
    Function::Substring,
    Function::Split,
    Function::ToString,
    Function::Sum,
    Function::Mul,
    Function::Diff,
    Function::Div,
    Function::ToLong,
    Function::ToDouble,
    Function::Floor,
    Function::Ceil,
    Function::Round,
    Function::ToDateTime,
    Function::UnixtimeSecondsToDateTime,
    Function::UnixtimeMillisecondsToDateTime,
    Function::ArrayToMap,
    Function::ArrayFromEntries,
    Function::Kv,
];

impl Function {
    /// Look up a function by name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        FUNCTIONS
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::StrCat => "strcat",
            Function::ToUpper => "toupper",
            Function::ToLower => "tolower",
            Function::Trim => "trim",
            Function::LTrim => "ltrim",
            Function::RTrim => "rtrim",
            Function::StrLen => "strlen",
            Function::Substring => "substring",
            Function::Split => "split",
            Function::ToString => "tostring",
            Function::Sum => "sum",
            Function::Mul => "mul",
            Function::Diff => "diff",
            Function::Div => "div",
            Function::ToLong => "tolong",
            Function::ToDouble => "todouble",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Round => "round",
            Function::ToDateTime => "todatetime",
            Function::UnixtimeSecondsToDateTime => "unixtime_seconds_todatetime",
            Function::UnixtimeMillisecondsToDateTime => "unixtime_milliseconds_todatetime",
            Function::ArrayToMap => "array_to_map",
            Function::ArrayFromEntries => "array_from_entries",
            Function::Kv => "kv",
        }
    }

    /// Accepted argument counts as (min, max); `None` is unbounded
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Function::StrCat | Function::Sum | Function::ArrayToMap => (1, None),
            Function::Mul => (2, None),
            Function::Trim | Function::LTrim | Function::RTrim | Function::Round => (1, Some(2)),
            Function::Substring | Function::Split => (2, Some(3)),
            Function::Diff | Function::Div | Function::ArrayFromEntries => (2, Some(2)),
            Function::Kv => (0, Some(1)),
            _ => (1, Some(1)),
        }
    }

    /// Whether `count` arguments are accepted
    pub fn accepts(&self, count: usize) -> bool {
        let (min, max) = self.arity();
        count >= min && max.map_or(true, |max| count <= max)
    }

    /// Apply the function to evaluated arguments
    pub fn call(&self, args: &[Value], record: &Value) -> Value {
        let arg = |i: usize| args.get(i).unwrap_or(&Value::Null);

        match self {
            Function::StrCat => Value::String(args.iter().map(Value::to_text).collect()),
            Function::ToUpper => map_text(arg(0), |s| s.to_uppercase()),
            Function::ToLower => map_text(arg(0), |s| s.to_lowercase()),
            Function::Trim | Function::LTrim | Function::RTrim => trim(*self, args),
            Function::StrLen => match coerce_string(arg(0)) {
                Some(s) => Value::from(s.chars().count() as i64),
                None => Value::Null,
            },
            Function::Substring => substring(arg(0), arg(1), args.get(2)),
            Function::Split => split(arg(0), arg(1), args.get(2)),
            Function::ToString => coerce_string(arg(0)).map_or(Value::Null, Value::String),
            Function::Sum => match args {
                [Value::Array(items)] => fold_numbers(items, 0.0, |a, b| a + b),
                _ => fold_numbers(args, 0.0, |a, b| a + b),
            },
            Function::Mul => fold_numbers(args, 1.0, |a, b| a * b),
            Function::Diff => binary(arg(0), arg(1), |a, b| Some(a - b)),
            Function::Div => binary(arg(0), arg(1), |a, b| if b == 0.0 { None } else { Some(a / b) }),
            Function::ToLong => unary(arg(0), f64::trunc),
            Function::ToDouble => unary(arg(0), |n| n),
            Function::Floor => unary(arg(0), f64::floor),
            Function::Ceil => unary(arg(0), f64::ceil),
            Function::Round => round(arg(0), args.get(1)),
            Function::ToDateTime => {
                timestamp_text(coerce_timestamp(arg(0), ColumnFormat::Timestamp, None))
            }
            Function::UnixtimeSecondsToDateTime => {
                timestamp_text(coerce_number(arg(0)).and_then(from_epoch_seconds))
            }
            Function::UnixtimeMillisecondsToDateTime => {
                timestamp_text(coerce_number(arg(0)).and_then(from_epoch_millis))
            }
            Function::ArrayToMap => array_to_map(arg(0), args.get(1..).unwrap_or(&[])),
            Function::ArrayFromEntries => array_from_entries(arg(0), arg(1)),
            Function::Kv => kv(args.first().unwrap_or(record)),
        }
    }
}

fn map_text<F: Fn(&str) -> String>(value: &Value, f: F) -> Value {
    coerce_string(value).map_or(Value::Null, |s| Value::String(f(&s)))
}

fn trim(function: Function, args: &[Value]) -> Value {
    // Two arguments are (characters, source)
    let (chars, source) = match args {
        [source] => (None, source),
        [chars, source] => (coerce_string(chars), source),
        _ => return Value::Null,
    };
    let text = match coerce_string(source) {
        Some(text) => text,
        None => return Value::Null,
    };

    let trimmed = match (&chars, function) {
        (None, Function::LTrim) => text.trim_start(),
        (None, Function::RTrim) => text.trim_end(),
        (None, _) => text.trim(),
        (Some(set), Function::LTrim) => text.trim_start_matches(|c: char| set.contains(c)),
        (Some(set), Function::RTrim) => text.trim_end_matches(|c: char| set.contains(c)),
        (Some(set), _) => text.trim_matches(|c: char| set.contains(c)),
    };
    Value::String(trimmed.to_string())
}

fn substring(source: &Value, start: &Value, length: Option<&Value>) -> Value {
    let text = match coerce_string(source) {
        Some(text) => text,
        None => return Value::Null,
    };
    let start = match coerce_number(start) {
        Some(n) => n.max(0.0) as usize,
        None => return Value::Null,
    };
    let chars = text.chars().skip(start);
    let result: String = match length.map(coerce_number) {
        None => chars.collect(),
        Some(Some(n)) => chars.take(n.max(0.0) as usize).collect(),
        Some(None) => return Value::Null,
    };
    Value::String(result)
}

fn split(source: &Value, delimiter: &Value, index: Option<&Value>) -> Value {
    let (text, delimiter) = match (coerce_string(source), coerce_string(delimiter)) {
        (Some(text), Some(delimiter)) if !delimiter.is_empty() => (text, delimiter),
        _ => return Value::Null,
    };
    let parts: Vec<Value> = text.split(delimiter.as_str()).map(Value::from).collect();

    match index.map(coerce_number) {
        None => Value::Array(parts),
        Some(Some(i)) if i >= 0.0 => parts.into_iter().nth(i as usize).unwrap_or(Value::Null),
        Some(_) => Value::Null,
    }
}

fn fold_numbers<F: Fn(f64, f64) -> f64>(values: &[Value], init: f64, f: F) -> Value {
    let mut acc = init;
    for value in values {
        match coerce_number(value) {
            Some(n) => acc = f(acc, n),
            None => return Value::Null,
        }
    }
    Value::Number(acc)
}

fn unary<F: Fn(f64) -> f64>(value: &Value, f: F) -> Value {
    coerce_number(value).map_or(Value::Null, |n| Value::Number(f(n)))
}

fn binary<F: Fn(f64, f64) -> Option<f64>>(a: &Value, b: &Value, f: F) -> Value {
    match (coerce_number(a), coerce_number(b)) {
        (Some(a), Some(b)) => f(a, b).map_or(Value::Null, Value::Number),
        _ => Value::Null,
    }
}

fn round(value: &Value, digits: Option<&Value>) -> Value {
    let n = match coerce_number(value) {
        Some(n) => n,
        None => return Value::Null,
    };
    let digits = digits.and_then(coerce_number).unwrap_or(0.0).clamp(0.0, 15.0) as i32;
    let factor = 10f64.powi(digits);
    Value::Number((n * factor).round() / factor)
}

fn timestamp_text(ts: Option<chrono::DateTime<chrono::Utc>>) -> Value {
    ts.map_or(Value::Null, |ts| Value::String(format_timestamp(&ts)))
}

/// Zip an array with key names; an array of arrays maps each inner array
fn array_to_map(array: &Value, names: &[Value]) -> Value {
    let names: Vec<String> = names.iter().map(Value::to_text).collect();
    let zip = |items: &[Value]| -> Value {
        let map: Map = names
            .iter()
            .zip(items)
            .map(|(name, item)| (name.clone(), item.clone()))
            .collect();
        Value::Object(map)
    };

    match array {
        Value::Array(items) if items.iter().all(|item| matches!(item, Value::Array(_))) && !items.is_empty() => {
            Value::Array(
                items
                    .iter()
                    .filter_map(Value::as_array)
                    .map(|inner| zip(inner.as_slice()))
                    .collect(),
            )
        }
        Value::Array(items) => zip(items),
        _ => Value::Null,
    }
}

/// Wrap each element of an array into an object under `key`
fn array_from_entries(key: &Value, array: &Value) -> Value {
    let key = key.to_text();
    match array {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| {
                    let mut map = Map::new();
                    map.insert(key.clone(), item.clone());
                    Value::Object(map)
                })
                .collect(),
        ),
        _ => Value::Null,
    }
}

/// Key/value entries of an object
pub fn kv(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Array(
            map.iter()
                .map(|(key, value)| {
                    let mut entry = Map::new();
                    entry.insert("key".to_string(), Value::from(key.as_str()));
                    entry.insert("value".to_string(), value.clone());
                    Value::Object(entry)
                })
                .collect(),
        ),
        _ => Value::Null,
    }
}
