// Type coercion from values into typed cells
// Author: Gabriel Demetrios Lafis

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::{format_number, Value};

const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Declared format of an output column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFormat {
    #[default]
    String,
    Number,
    Timestamp,
    #[serde(rename = "timestamp_epoch", alias = "timestamp_epoch_millis")]
    TimestampEpochMillis,
    #[serde(rename = "timestamp_epoch_s", alias = "timestamp_epoch_seconds")]
    TimestampEpochSeconds,
}

impl ColumnFormat {
    /// Parse a format name as used in column declarations
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "string" | "text" => Some(ColumnFormat::String),
            "number" | "numeric" => Some(ColumnFormat::Number),
            "timestamp" | "time" => Some(ColumnFormat::Timestamp),
            "timestamp_epoch" | "timestamp_epoch_millis" => Some(ColumnFormat::TimestampEpochMillis),
            "timestamp_epoch_s" | "timestamp_epoch_seconds" => Some(ColumnFormat::TimestampEpochSeconds),
            _ => None,
        }
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(
            self,
            ColumnFormat::Timestamp | ColumnFormat::TimestampEpochMillis | ColumnFormat::TimestampEpochSeconds
        )
    }

    /// Type of the cells this format produces
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnFormat::String => ColumnType::String,
            ColumnFormat::Number => ColumnType::Number,
            _ => ColumnType::Timestamp,
        }
    }
}

/// Type of a frame column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Timestamp,
}

/// Typed cell of a frame row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    String(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Cell::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Convert back into the value model; timestamps become RFC3339 strings
    pub fn to_value(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::String(s) => Value::String(s.clone()),
            Cell::Number(n) => Value::Number(*n),
            Cell::Timestamp(ts) => Value::String(format_timestamp(ts)),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_unit(),
            Cell::String(s) => serializer.serialize_str(s),
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Timestamp(ts) => serializer.serialize_i64(ts.timestamp_millis()),
        }
    }
}

/// Coerce a value into a cell of the given format
pub fn coerce(value: &Value, format: ColumnFormat, timestamp_pattern: Option<&str>) -> Cell {
    match format {
        ColumnFormat::String => coerce_string(value).map_or(Cell::Null, Cell::String),
        ColumnFormat::Number => coerce_number(value).map_or(Cell::Null, Cell::Number),
        _ => coerce_timestamp(value, format, timestamp_pattern).map_or(Cell::Null, Cell::Timestamp),
    }
}

/// Textual form of a value; containers are pretty-printed as JSON
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(format_number(*n)),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_pretty_json()),
    }
}

/// Numeric form of a value
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_number(s),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse a decimal number, accepting `,` group separators
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(n) = text.parse::<f64>().ok().filter(|n| n.is_finite()) {
        return Some(n);
    }

    if !text.contains(',') {
        return None;
    }

    let stripped: String = text.chars().filter(|c| *c != ',').collect();
    stripped.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Timestamp form of a value
pub fn coerce_timestamp(
    value: &Value,
    format: ColumnFormat,
    timestamp_pattern: Option<&str>,
) -> Option<DateTime<Utc>> {
    match (value, format) {
        (Value::Number(n), ColumnFormat::TimestampEpochSeconds) => from_epoch_seconds(*n),
        (Value::Number(n), _) => from_epoch_millis(*n),
        (Value::String(s), ColumnFormat::TimestampEpochMillis) => match parse_number(s) {
            Some(n) => from_epoch_millis(n),
            None => parse_timestamp(s, timestamp_pattern),
        },
        (Value::String(s), ColumnFormat::TimestampEpochSeconds) => match parse_number(s) {
            Some(n) => from_epoch_seconds(n),
            None => parse_timestamp(s, timestamp_pattern),
        },
        (Value::String(s), _) => parse_timestamp(s, timestamp_pattern),
        _ => None,
    }
}

pub fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    Utc.timestamp_opt(whole as i64, nanos).single()
}

/// Parse a textual timestamp, trying the pattern first and then the known layouts
pub fn parse_timestamp(text: &str, pattern: Option<&str>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(pattern) = pattern.filter(|p| !p.trim().is_empty()) {
        if let Some(ts) = parse_with_layout(text, pattern) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(text) {
        return Some(ts.with_timezone(&Utc));
    }

    let layouts = OFFSET_LAYOUTS.iter().chain(NAIVE_LAYOUTS).chain(DATE_LAYOUTS);
    for layout in layouts {
        if let Some(ts) = parse_with_layout(text, layout) {
            return Some(ts);
        }
    }

    parse_partial_date(text)
}

fn parse_with_layout(text: &str, layout: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_str(text, layout) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, layout)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Bare years, year/month partials and all-digit epoch strings
fn parse_partial_date(text: &str) -> Option<DateTime<Utc>> {
    let all_digits = text.chars().all(|c| c.is_ascii_digit());

    if all_digits && text.len() == 4 {
        return first_day(text.parse().ok()?, 1);
    }

    if all_digits && text.len() >= 10 {
        return from_epoch_millis(text.parse().ok()?);
    }

    let (year, month) = text.split_once(|c: char| c == '-' || c == '/')?;
    let valid = year.len() == 4
        && (1..=2).contains(&month.len())
        && year.chars().chain(month.chars()).all(|c| c.is_ascii_digit());
    if !valid {
        return None;
    }

    first_day(year.parse().ok()?, month.parse().ok()?)
}

fn first_day(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Render a timestamp as RFC3339 with millisecond precision
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
