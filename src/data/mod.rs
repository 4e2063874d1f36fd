// Data module for the value model and payload readers
// Author: Gabriel Demetrios Lafis

mod coerce;
mod compare;
mod csv;
mod graphql;
mod json;
mod selector;
mod xml;
mod yaml;

pub use self::csv::*;
pub use coerce::*;
pub use compare::*;
pub use graphql::*;
pub use json::*;
pub use selector::*;
pub use xml::*;
pub use yaml::*;

use std::fmt;
use std::ops::Index;

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use thiserror::Error;

/// Ordered key/value storage backing `Value::Object`
pub type Map = IndexMap<String, Value>;

/// Reads a raw payload into the value model
pub trait PayloadReader {
    /// Parse the raw bytes into a value
    fn read(&self, raw: &[u8], warnings: &mut Warnings) -> Result<Value, ParseError>;

    /// Get the content type handled by this reader
    fn content_type(&self) -> ContentType;
}

/// Content types understood by the readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Json,
    Csv,
    Tsv,
    Xml,
    Html,
    GraphQl,
    Yaml,
}

impl ContentType {
    /// Parse a content type name such as `json` or `text/csv`
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        let name = name.rsplit('/').next().unwrap_or_default();
        match name {
            "json" => Some(ContentType::Json),
            "csv" => Some(ContentType::Csv),
            "tsv" | "tab-separated-values" => Some(ContentType::Tsv),
            "xml" => Some(ContentType::Xml),
            "html" => Some(ContentType::Html),
            "graphql" => Some(ContentType::GraphQl),
            "yaml" | "yml" | "x-yaml" => Some(ContentType::Yaml),
            _ => None,
        }
    }
}

/// Read a payload with the reader matching its content type
pub fn read_payload(
    raw: &[u8],
    content_type: ContentType,
    csv_options: &CsvOptions,
    warnings: &mut Warnings,
) -> Result<Value, ParseError> {
    match content_type {
        ContentType::Json => JsonReader.read(raw, warnings),
        ContentType::GraphQl => GraphQlReader.read(raw, warnings),
        ContentType::Csv => CsvReader::new(csv_options.clone()).read(raw, warnings),
        ContentType::Tsv => CsvReader::new(csv_options.clone().tab_separated()).read(raw, warnings),
        ContentType::Xml => XmlReader::xml().read(raw, warnings),
        ContentType::Html => XmlReader::html().read(raw, warnings),
        ContentType::Yaml => YamlReader.read(raw, warnings),
    }
}

/// Dynamic value shared by every reader, evaluator and assembler
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key on an object value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Get the type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Truthiness used by predicates
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }

    /// Textual representation; containers render as compact JSON
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self.to_json_string(),
        }
    }

    /// Compact JSON text
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Pretty-printed JSON text
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Stable key used to group values by equality
    pub fn group_key(&self) -> String {
        self.to_json_string()
    }
}

/// Format a number without a trailing `.0` when it is integral
pub fn format_number(n: f64) -> String {
    if is_integral(n) {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15
}

static NULL: Value = Value::Null;

impl Index<usize> for Value {
    type Output = Value;

    /// Array element, or null when out of range or not an array
    fn index(&self, index: usize) -> &Value {
        self.as_array().and_then(|items| items.get(index)).unwrap_or(&NULL)
    }
}

impl Index<&str> for Value {
    type Output = Value;

    /// Object member, or null when missing or not an object
    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if is_integral(*n) => serializer.serialize_i64(*n as i64),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::Object(
                obj.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

/// Collector for non-fatal data quality issues raised during one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Warnings {
    messages: Vec<String>,
}

impl Warnings {
    pub fn new() -> Self {
        Warnings::default()
    }

    /// Record a warning
    pub fn push<S: Into<String>>(&mut self, message: S) {
        let message = message.into();
        log::warn!("{}", message);
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.messages
    }

    pub fn into_vec(self) -> Vec<String> {
        self.messages
    }
}

/// Represents an error raised by a payload reader
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("JSON syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("CSV error at line {line}: {message}")]
    Csv { line: u64, message: String },
    #[error("XML error at position {position}: {message}")]
    Xml { position: usize, message: String },
    #[error("YAML error: {message}")]
    Yaml { message: String },
    #[error("GraphQL response error: {}", messages.join("; "))]
    GraphQl { messages: Vec<String> },
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(String),
}

/// Decode raw bytes as UTF-8 text, stripping a byte order mark
pub(crate) fn decode_text(raw: &[u8]) -> Result<&str, ParseError> {
    let text = std::str::from_utf8(raw).map_err(|e| ParseError::Encoding(e.to_string()))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}
