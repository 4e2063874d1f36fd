// JSON payload reader
// Author: Gabriel Demetrios Lafis

use super::{ContentType, ParseError, PayloadReader, Value, Warnings};

/// JSON payload reader
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl PayloadReader for JsonReader {
    fn read(&self, raw: &[u8], _warnings: &mut Warnings) -> Result<Value, ParseError> {
        parse_json(raw)
    }

    fn content_type(&self) -> ContentType {
        ContentType::Json
    }
}

/// Parse JSON text into a value, keeping object key order
pub fn parse_json<T: AsRef<[u8]>>(raw: T) -> Result<Value, ParseError> {
    let raw = raw.as_ref();
    let text = super::decode_text(raw)?;

    let json: serde_json::Value = serde_json::from_str(text).map_err(|e| ParseError::Syntax {
        offset: byte_offset(text, e.line(), e.column()),
        message: e.to_string(),
    })?;

    Ok(Value::from(json))
}

/// Convert a 1-based line and column into a byte offset within `text`
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }

    let line_start: usize = text
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();

    (line_start + column.saturating_sub(1)).min(text.len())
}
