// CSV and TSV payload reader
// Author: Gabriel Demetrios Lafis

use serde::{Deserialize, Serialize};

use super::{ContentType, Map, ParseError, PayloadReader, Value, Warnings};

/// Options controlling how delimited text is read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: char,
    pub quote: char,
    pub comment: Option<char>,
    pub has_header: bool,
    /// Field names to use instead of the header row
    pub headers: Vec<String>,
    pub skip_empty_lines: bool,
    pub skip_lines_with_error: bool,
    pub relax_column_count: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: ',',
            quote: '"',
            comment: None,
            has_header: true,
            headers: Vec::new(),
            skip_empty_lines: false,
            skip_lines_with_error: false,
            relax_column_count: false,
        }
    }
}

impl CsvOptions {
    /// Same options with a tab delimiter
    pub fn tab_separated(mut self) -> Self {
        self.delimiter = '\t';
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn skip_lines_with_error(mut self, skip: bool) -> Self {
        self.skip_lines_with_error = skip;
        self
    }

    pub fn relax_column_count(mut self, relax: bool) -> Self {
        self.relax_column_count = relax;
        self
    }
}

/// CSV payload reader
#[derive(Debug, Clone, Default)]
pub struct CsvReader {
    options: CsvOptions,
}

impl CsvReader {
    /// Create a new CSV reader
    pub fn new(options: CsvOptions) -> Self {
        CsvReader { options }
    }
}

impl PayloadReader for CsvReader {
    fn read(&self, raw: &[u8], warnings: &mut Warnings) -> Result<Value, ParseError> {
        let text = super::decode_text(raw)?;
        parse_csv(text, &self.options, warnings)
    }

    fn content_type(&self) -> ContentType {
        if self.options.delimiter == '\t' {
            ContentType::Tsv
        } else {
            ContentType::Csv
        }
    }
}

/// Parse delimited text into an array of objects keyed by field name
pub fn parse_csv(text: &str, options: &CsvOptions, warnings: &mut Warnings) -> Result<Value, ParseError> {
    let delimiter = ascii_byte(options.delimiter, b',');
    let quote = ascii_byte(options.quote, b'"');
    let comment = options.comment.map(|c| ascii_byte(c, b'#'));

    // Headers and column counts are handled here so that bad records can be skipped
    let mut csv_reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(quote)
        .comment(comment)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut headers: Option<Vec<String>> = if options.headers.is_empty() {
        None
    } else {
        Some(options.headers.clone())
    };
    let mut header_pending = options.has_header;

    let mut rows = Vec::new();
    let mut record = ::csv::StringRecord::new();

    loop {
        let start = csv_reader.position().byte() as usize;

        let more = csv_reader.read_record(&mut record).map_err(|e| ParseError::Csv {
            line: e.position().map_or(0, |p| p.line()),
            message: e.to_string(),
        })?;

        if !more {
            break;
        }

        let end = (csv_reader.position().byte() as usize).min(text.len());
        let line = record.position().map_or(0, |p| p.line());

        if options.skip_empty_lines
            && !header_pending
            && record.iter().all(|field| field.trim().is_empty())
        {
            continue;
        }

        let problem = check_quoting(&text.as_bytes()[start.min(end)..end], delimiter, quote, comment)
            .err()
            .or_else(|| {
                if header_pending || options.relax_column_count {
                    return None;
                }
                headers
                    .as_ref()
                    .filter(|names| names.len() != record.len())
                    .map(|names| format!("expected {} fields, found {}", names.len(), record.len()))
            });

        if let Some(message) = problem {
            if options.skip_lines_with_error {
                warnings.push(format!("skipped CSV line {}: {}", line, message));
                continue;
            }
            return Err(ParseError::Csv { line, message });
        }

        if header_pending {
            header_pending = false;
            if headers.is_none() {
                headers = Some(record.iter().map(|name| name.trim().to_string()).collect());
            }
            continue;
        }

        let mut row = Map::new();
        for (i, field) in record.iter().enumerate() {
            let name = headers
                .as_ref()
                .and_then(|names| names.get(i))
                .cloned()
                .unwrap_or_else(|| format!("column_{}", i));

            let value = if field.is_empty() {
                Value::Null
            } else {
                Value::String(field.to_string())
            };
            row.insert(name, value);
        }

        rows.push(Value::Object(row));
    }

    log::debug!("read {} CSV rows", rows.len());

    Ok(Value::Array(rows))
}

fn ascii_byte(c: char, fallback: u8) -> u8 {
    u8::try_from(c).ok().filter(u8::is_ascii).unwrap_or(fallback)
}

/// Validate the quoting of one raw record, including any skipped lines before it
fn check_quoting(raw: &[u8], delimiter: u8, quote: u8, comment: Option<u8>) -> Result<(), String> {
    let mut i = 0;

    // Blank and comment lines consumed ahead of the record
    while i < raw.len() {
        let line_end = raw[i..].iter().position(|&b| b == b'\n').map(|p| i + p + 1);
        let line = &raw[i..line_end.unwrap_or(raw.len())];
        let blank = line.iter().all(|&b| b == b'\r' || b == b'\n');
        let commented = comment.map_or(false, |c| line.first() == Some(&c));

        match line_end {
            Some(next) if blank || commented => i = next,
            _ => break,
        }
    }

    let mut field = 0;
    let mut at_field_start = true;
    let mut in_quotes = false;

    while i < raw.len() {
        let b = raw[i];

        if in_quotes {
            if b == quote {
                if raw.get(i + 1) == Some(&quote) {
                    i += 2;
                    continue;
                }
                in_quotes = false;
                match raw.get(i + 1) {
                    None => {}
                    Some(&next) if next == delimiter || next == b'\n' || next == b'\r' => {}
                    Some(&next) => {
                        return Err(format!(
                            "invalid closing quote in field {}: found '{}' instead of delimiter",
                            field, next as char
                        ));
                    }
                }
            }
        } else if b == quote {
            if !at_field_start {
                return Err(format!(
                    "invalid opening quote in field {}: quote found inside an unquoted field",
                    field
                ));
            }
            in_quotes = true;
            at_field_start = false;
        } else if b == delimiter {
            field += 1;
            at_field_start = true;
        } else if b == b'\n' || b == b'\r' {
            return Ok(());
        } else {
            at_field_start = false;
        }

        i += 1;
    }

    if in_quotes {
        Err(format!("unterminated quoted field {}", field))
    } else {
        Ok(())
    }
}
