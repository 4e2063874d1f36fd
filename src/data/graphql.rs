// GraphQL response reader
// Author: Gabriel Demetrios Lafis

use super::{parse_json, ContentType, ParseError, PayloadReader, Value, Warnings};

/// Reader for GraphQL responses (`{"data": ..., "errors": [...]}`)
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphQlReader;

impl PayloadReader for GraphQlReader {
    fn read(&self, raw: &[u8], warnings: &mut Warnings) -> Result<Value, ParseError> {
        let response = parse_json(raw)?;

        let messages: Vec<String> = response
            .get("errors")
            .and_then(Value::as_array)
            .map(|errors| errors.iter().map(error_message).collect())
            .unwrap_or_default();

        if messages.is_empty() {
            return Ok(response);
        }

        let has_data = response.get("data").map_or(false, |data| !data.is_null());
        if !has_data {
            return Err(ParseError::GraphQl { messages });
        }

        for message in messages {
            warnings.push(format!("GraphQL error: {}", message));
        }

        Ok(response)
    }

    fn content_type(&self) -> ContentType {
        ContentType::GraphQl
    }
}

fn error_message(error: &Value) -> String {
    match error.get("message") {
        Some(Value::String(message)) => message.clone(),
        _ => error.to_text(),
    }
}
