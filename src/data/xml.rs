// XML and HTML payload reader
// Author: Gabriel Demetrios Lafis

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{ContentType, Map, ParseError, PayloadReader, Value, Warnings};

/// Prefix applied to attribute keys so they never collide with child elements
pub const ATTRIBUTE_PREFIX: &str = "@";

/// Key holding the text of elements that also carry attributes or children
pub const TEXT_KEY: &str = "#text";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// XML and HTML payload reader
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlReader {
    html: bool,
}

impl XmlReader {
    /// Strict reader for well-formed XML
    pub fn xml() -> Self {
        XmlReader { html: false }
    }

    /// Lenient reader for HTML markup
    pub fn html() -> Self {
        XmlReader { html: true }
    }
}

impl PayloadReader for XmlReader {
    fn read(&self, raw: &[u8], _warnings: &mut Warnings) -> Result<Value, ParseError> {
        let text = super::decode_text(raw)?;
        parse_xml(text, self.html)
    }

    fn content_type(&self) -> ContentType {
        if self.html {
            ContentType::Html
        } else {
            ContentType::Xml
        }
    }
}

/// Element being assembled while its end tag is pending
struct Element {
    name: String,
    fields: Map,
    text: String,
}

impl Element {
    fn new(name: String) -> Self {
        Element {
            name,
            fields: Map::new(),
            text: String::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }

    fn finish(self) -> Value {
        if self.fields.is_empty() {
            return Value::String(self.text);
        }

        let mut fields = self.fields;
        if !self.text.is_empty() {
            fields.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        Value::Object(fields)
    }
}

/// Insert a child, collapsing repeated sibling names into an array
fn insert_child(fields: &mut Map, name: String, value: Value) {
    match fields.get_mut(&name) {
        None => {
            fields.insert(name, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::take(existing);
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Parse markup into a value rooted at an object keyed by the top-level tag
pub fn parse_xml(text: &str, html: bool) -> Result<Value, ParseError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    reader.expand_empty_elements(false);
    reader.check_end_names(!html);

    // The bottom of the stack is the document itself
    let mut stack = vec![Element::new(String::new())];

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| ParseError::Xml {
            position,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                let element = open_element(&start, html, position)?;
                if html && VOID_ELEMENTS.contains(&element.name.as_str()) {
                    attach(&mut stack, element);
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(start) => {
                let element = open_element(&start, html, position)?;
                attach(&mut stack, element);
            }
            Event::End(end) => {
                let name = tag_name(end.name().as_ref(), html);
                if html {
                    // Unmatched end tags are ignored, unclosed children are closed implicitly
                    if let Some(depth) = stack.iter().rposition(|e| e.name == name).filter(|d| *d > 0) {
                        while stack.len() > depth {
                            close_top(&mut stack);
                        }
                    }
                } else if stack.len() > 1 {
                    close_top(&mut stack);
                } else {
                    return Err(ParseError::Xml {
                        position,
                        message: format!("unexpected end tag </{}>", name),
                    });
                }
            }
            Event::Text(content) => {
                let decoded = match content.unescape() {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) if html => String::from_utf8_lossy(&content).into_owned(),
                    Err(e) => {
                        return Err(ParseError::Xml {
                            position,
                            message: e.to_string(),
                        })
                    }
                };
                if let Some(top) = stack.last_mut() {
                    top.push_text(&decoded);
                }
            }
            Event::CData(content) => {
                let decoded = String::from_utf8_lossy(&content.into_inner()).into_owned();
                if let Some(top) = stack.last_mut() {
                    top.push_text(&decoded);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        if !html {
            let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
            return Err(ParseError::Xml {
                position: text.len(),
                message: format!("unclosed element <{}>", open),
            });
        }
        while stack.len() > 1 {
            close_top(&mut stack);
        }
    }

    let document = stack.pop().map(|doc| doc.fields).unwrap_or_default();
    Ok(Value::Object(document))
}

fn tag_name(raw: &[u8], html: bool) -> String {
    let name = String::from_utf8_lossy(raw);
    if html {
        name.to_lowercase()
    } else {
        name.into_owned()
    }
}

fn open_element(start: &BytesStart, html: bool, position: usize) -> Result<Element, ParseError> {
    let mut element = Element::new(tag_name(start.name().as_ref(), html));

    let attributes = if html {
        start.html_attributes()
    } else {
        start.attributes()
    };

    for attribute in attributes {
        let attribute = attribute.map_err(|e| ParseError::Xml {
            position,
            message: e.to_string(),
        })?;

        let key = format!(
            "{}{}",
            ATTRIBUTE_PREFIX,
            tag_name(attribute.key.as_ref(), html)
        );
        let value = match attribute.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) if html => String::from_utf8_lossy(&attribute.value).into_owned(),
            Err(e) => {
                return Err(ParseError::Xml {
                    position,
                    message: e.to_string(),
                })
            }
        };

        element.fields.insert(key, Value::String(value));
    }

    Ok(element)
}

fn attach(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        let name = element.name.clone();
        insert_child(&mut parent.fields, name, element.finish());
    }
}

fn close_top(stack: &mut Vec<Element>) {
    if stack.len() <= 1 {
        return;
    }
    if let Some(element) = stack.pop() {
        attach(stack, element);
    }
}
