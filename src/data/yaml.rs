// YAML payload reader
// Author: Gabriel Demetrios Lafis

use serde_yaml::Value as YamlValue;

use super::{ContentType, Map, ParseError, PayloadReader, Value, Warnings};

/// YAML payload reader
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlReader;

impl PayloadReader for YamlReader {
    fn read(&self, raw: &[u8], _warnings: &mut Warnings) -> Result<Value, ParseError> {
        let text = super::decode_text(raw)?;
        parse_yaml(text)
    }

    fn content_type(&self) -> ContentType {
        ContentType::Yaml
    }
}

/// Parse YAML text into a value
pub fn parse_yaml(text: &str) -> Result<Value, ParseError> {
    let yaml: YamlValue = serde_yaml::from_str(text).map_err(|e| ParseError::Yaml {
        message: e.to_string(),
    })?;

    Ok(yaml_to_value(yaml))
}

fn yaml_to_value(yaml: YamlValue) -> Value {
    match yaml {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_value).collect()),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key), yaml_to_value(value));
            }
            Value::Object(map)
        }
    }
}

fn yaml_key(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        other => yaml_to_value(other).to_text(),
    }
}
