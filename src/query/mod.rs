// Query module tying readers, evaluators and assemblers together
// Author: Gabriel Demetrios Lafis

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{
    decode_text, read_payload, resolve, rows_of, ContentType, CsvOptions, ParseError, Value,
    Warnings,
};
use crate::frame::{to_table, to_timeseries, ColumnSpec, Frame, FrameError, SeriesSet};
use crate::groq::{parse_query, GroqSyntaxError};
use crate::processing::jsonata::{self, JsonataError};
use crate::processing::{Pipeline, PipelineError};
use crate::utils::{validate_columns, validate_query_text};

/// Which engine turns the payload into rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    #[default]
    Simple,
    Backend,
    Uql,
    Groq,
}

/// Shape of the query output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    #[default]
    Table,
    #[serde(alias = "time_series")]
    Timeseries,
}

/// Everything needed to turn one payload into output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    /// Name given to the output frame
    pub name: String,
    #[serde(alias = "type")]
    pub content_type: ContentType,
    pub parser: ParserKind,
    pub columns: Vec<ColumnSpec>,
    #[serde(alias = "root")]
    pub root_selector: String,
    pub uql: String,
    pub groq: String,
    #[serde(alias = "format")]
    pub output_shape: OutputShape,
    /// CSV settings; engine defaults apply when absent
    pub csv_options: Option<CsvOptions>,
}

impl QueryRequest {
    pub fn new(content_type: ContentType, parser: ParserKind) -> Self {
        QueryRequest {
            content_type,
            parser,
            ..Default::default()
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnSpec>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_root_selector(mut self, selector: &str) -> Self {
        self.root_selector = selector.to_string();
        self
    }

    pub fn with_uql(mut self, source: &str) -> Self {
        self.uql = source.to_string();
        self
    }

    pub fn with_groq(mut self, source: &str) -> Self {
        self.groq = source.to_string();
        self
    }

    pub fn with_output_shape(mut self, shape: OutputShape) -> Self {
        self.output_shape = shape;
        self
    }

    pub fn with_csv_options(mut self, options: CsvOptions) -> Self {
        self.csv_options = Some(options);
        self
    }
}

/// Defaults applied where a request leaves settings unspecified
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineDefaults {
    pub csv: CsvOptions,
    pub timestamp_pattern: Option<String>,
}

/// Raw input handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
    Structured(Value),
}

impl Payload {
    /// The payload as a value without running a reader: text stays text
    fn into_raw_value(self) -> Result<Value, ParseError> {
        match self {
            Payload::Bytes(raw) => decode_text(&raw).map(Value::from),
            Payload::Text(text) => Ok(Value::String(text)),
            Payload::Structured(value) => Ok(value),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Structured(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(raw: Vec<u8>) -> Self {
        Payload::Bytes(raw)
    }
}

/// Typed output of a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOutput {
    Table(Frame),
    Timeseries(SeriesSet),
}

/// Output plus the non-fatal warnings raised while producing it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub output: QueryOutput,
    pub warnings: Vec<String>,
}

impl QueryResponse {
    pub fn table(&self) -> Option<&Frame> {
        match &self.output {
            QueryOutput::Table(frame) => Some(frame),
            QueryOutput::Timeseries(_) => None,
        }
    }

    pub fn timeseries(&self) -> Option<&SeriesSet> {
        match &self.output {
            QueryOutput::Timeseries(series) => Some(series),
            QueryOutput::Table(_) => None,
        }
    }
}

/// Represents an error raised while executing a query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Groq(#[from] GroqSyntaxError),
    #[error(transparent)]
    Jsonata(#[from] JsonataError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Reject requests that cannot succeed whatever the payload
pub fn validate_request(request: &QueryRequest) -> Result<(), EngineError> {
    let query_text = match request.parser {
        ParserKind::Uql => validate_query_text("uql", &request.uql),
        ParserKind::Groq => validate_query_text("groq", &request.groq),
        ParserKind::Simple | ParserKind::Backend => Ok(()),
    };

    query_text
        .and_then(|()| validate_columns(&request.columns, request.output_shape == OutputShape::Timeseries))
        .map_err(EngineError::InvalidRequest)
}

/// Execute a request with built-in defaults
pub fn execute(request: &QueryRequest, payload: Payload) -> Result<QueryResponse, EngineError> {
    execute_with(request, payload, &EngineDefaults::default())
}

/// Execute a request, filling unspecified settings from `defaults`
pub fn execute_with(
    request: &QueryRequest,
    payload: Payload,
    defaults: &EngineDefaults,
) -> Result<QueryResponse, EngineError> {
    validate_request(request)?;

    let mut warnings = Warnings::new();
    let csv_options = request.csv_options.as_ref().unwrap_or(&defaults.csv);

    log::debug!(
        "executing {:?} query over {:?} payload",
        request.parser,
        request.content_type
    );

    let result = match request.parser {
        ParserKind::Simple | ParserKind::Backend => {
            let value = read(&payload, request.content_type, csv_options, &mut warnings)?;
            apply_root_selector(value, &request.root_selector)?
        }
        ParserKind::Uql => {
            let pipeline = Pipeline::parse_with(&request.uql, csv_options)?;
            let input = if pipeline.starts_with_parse() {
                payload.into_raw_value()?
            } else {
                let value = read(&payload, request.content_type, csv_options, &mut warnings)?;
                apply_root_selector(value, &request.root_selector)?
            };
            pipeline.execute(input, &mut warnings)?
        }
        ParserKind::Groq => {
            let query = parse_query(&request.groq)?;
            let value = read(&payload, request.content_type, csv_options, &mut warnings)?;
            let value = apply_root_selector(value, &request.root_selector)?;
            query.evaluate(&value)
        }
    };

    let rows = rows_of(result);
    let columns = with_timestamp_pattern(&request.columns, defaults.timestamp_pattern.as_deref());

    let output = match request.output_shape {
        OutputShape::Table => {
            QueryOutput::Table(to_table(&rows, &columns, &mut warnings).with_name(&request.name))
        }
        OutputShape::Timeseries => {
            let mut series = to_timeseries(&rows, &columns, &mut warnings)?;
            series.name = request.name.clone();
            QueryOutput::Timeseries(series)
        }
    };

    Ok(QueryResponse {
        output,
        warnings: warnings.into_vec(),
    })
}

fn read(
    payload: &Payload,
    content_type: ContentType,
    csv_options: &CsvOptions,
    warnings: &mut Warnings,
) -> Result<Value, ParseError> {
    match payload {
        Payload::Bytes(raw) => read_payload(raw, content_type, csv_options, warnings),
        Payload::Text(text) => read_payload(text.as_bytes(), content_type, csv_options, warnings),
        Payload::Structured(value) => Ok(value.clone()),
    }
}

/// Narrow a value to the root selector; `$`-prefixed selectors are JSONata
pub fn apply_root_selector(value: Value, selector: &str) -> Result<Value, JsonataError> {
    let selector = selector.trim();
    if selector.is_empty() || selector == "$" || selector == "." {
        return Ok(value);
    }
    if selector.starts_with('$') {
        return jsonata::evaluate(selector, &value);
    }
    Ok(resolve(&value, selector))
}

fn with_timestamp_pattern(columns: &[ColumnSpec], pattern: Option<&str>) -> Vec<ColumnSpec> {
    columns
        .iter()
        .map(|column| match (pattern, &column.timestamp_pattern) {
            (Some(pattern), None) if column.format.is_timestamp() => {
                column.clone().with_timestamp_pattern(pattern)
            }
            _ => column.clone(),
        })
        .collect()
}
