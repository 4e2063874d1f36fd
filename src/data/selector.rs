// Path selectors over the value model
// Author: Gabriel Demetrios Lafis

use super::Value;

/// One step of a dotted path
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Split a selector such as `data.items[0].name` into segments
pub fn parse_path(selector: &str) -> Vec<PathSegment> {
    let selector = selector.trim();
    let selector = selector
        .strip_prefix("$.")
        .or_else(|| selector.strip_prefix('$'))
        .unwrap_or(selector);

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = selector.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => flush_key(&mut current, &mut segments),
            '[' => {
                flush_key(&mut current, &mut segments);
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                let inner = inner.trim();
                let unquoted = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
                match (unquoted, inner.parse::<usize>()) {
                    (Some(key), _) => segments.push(PathSegment::Key(key.to_string())),
                    (None, Ok(index)) => segments.push(PathSegment::Index(index)),
                    (None, Err(_)) if !inner.is_empty() => {
                        segments.push(PathSegment::Key(inner.to_string()))
                    }
                    _ => {}
                }
            }
            _ => current.push(c),
        }
    }
    flush_key(&mut current, &mut segments);

    segments
}

fn flush_key(current: &mut String, segments: &mut Vec<PathSegment>) {
    if !current.is_empty() {
        segments.push(PathSegment::Key(std::mem::take(current)));
    }
}

/// Resolve a selector against a value; missing paths resolve to `Value::Null`
pub fn resolve(value: &Value, selector: &str) -> Value {
    resolve_ref(value, selector).cloned().unwrap_or(Value::Null)
}

/// Resolve a selector without cloning
pub fn resolve_ref<'a>(value: &'a Value, selector: &str) -> Option<&'a Value> {
    resolve_segments(value, &parse_path(selector))
}

/// Walk pre-parsed segments
pub fn resolve_segments<'a>(value: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = value;

    for segment in segments {
        current = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key)?,
            (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string())?,
            (Value::Array(items), PathSegment::Index(index)) => items.get(*index)?,
            (Value::Array(items), PathSegment::Key(key)) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Normalize a value into rows: arrays yield their elements, null yields nothing
pub fn rows_of(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
