// Processing module for the pipe-delimited query pipeline
// Author: Gabriel Demetrios Lafis

mod aggregate;
mod expr;
mod filter;
pub mod jsonata;
mod parser;
mod sort;
mod transform;

pub use aggregate::*;
pub use expr::*;
pub use filter::*;
pub use parser::*;
pub use sort::*;
pub use transform::*;

use thiserror::Error;

use crate::data::{
    parse_csv, parse_json, parse_xml, parse_yaml, resolve, rows_of, CsvOptions, Map, Value, Warnings,
};

/// Represents an error raised while building or running a pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("unknown verb '{verb}' at position {position}")]
    UnknownVerb { verb: String, position: usize },
    #[error("unknown function '{name}' at position {position}")]
    UnknownFunction { name: String, position: usize },
    #[error("stage {stage_index} failed: {reason}")]
    StageFailed { stage_index: usize, reason: String },
}

/// One verb of a pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStage {
    ParseJson,
    ParseCsv(CsvOptions),
    ParseXml { html: bool },
    ParseYaml,
    Scope(String),
    Project(Vec<Assignment>),
    ProjectAway(Vec<String>),
    Extend(Vec<Assignment>),
    Summarize { aggregates: Vec<Aggregate>, by: Vec<String> },
    MvExpand(String),
    OrderBy(Vec<SortKey>),
    Limit(usize),
    Where(Predicate),
    Count,
    JsonataExpr(jsonata::Expression),
}

impl PipelineStage {
    /// Verb text of the stage
    pub fn verb(&self) -> &'static str {
        match self {
            PipelineStage::ParseJson => "parse-json",
            PipelineStage::ParseCsv(_) => "parse-csv",
            PipelineStage::ParseXml { html: false } => "parse-xml",
            PipelineStage::ParseXml { html: true } => "parse-html",
            PipelineStage::ParseYaml => "parse-yaml",
            PipelineStage::Scope(_) => "scope",
            PipelineStage::Project(_) => "project",
            PipelineStage::ProjectAway(_) => "project-away",
            PipelineStage::Extend(_) => "extend",
            PipelineStage::Summarize { .. } => "summarize",
            PipelineStage::MvExpand(_) => "mv-expand",
            PipelineStage::OrderBy(_) => "order by",
            PipelineStage::Limit(_) => "limit",
            PipelineStage::Where(_) => "where",
            PipelineStage::Count => "count",
            PipelineStage::JsonataExpr(_) => "jsonata",
        }
    }

    /// Whether the stage turns raw text into a value
    pub fn is_parse_stage(&self) -> bool {
        matches!(
            self,
            PipelineStage::ParseJson
                | PipelineStage::ParseCsv(_)
                | PipelineStage::ParseXml { .. }
                | PipelineStage::ParseYaml
        )
    }

    /// Apply the stage to a value
    pub fn apply(&self, input: Value, warnings: &mut Warnings) -> Result<Value, String> {
        match self {
            PipelineStage::ParseJson => match input {
                Value::String(text) => parse_json(text).map_err(|e| e.to_string()),
                other => Ok(other),
            },
            PipelineStage::ParseCsv(options) => {
                let text = expect_text(&input, self.verb())?;
                parse_csv(text, options, warnings).map_err(|e| e.to_string())
            }
            PipelineStage::ParseXml { html } => {
                let text = expect_text(&input, self.verb())?;
                parse_xml(text, *html).map_err(|e| e.to_string())
            }
            PipelineStage::ParseYaml => {
                let text = expect_text(&input, self.verb())?;
                parse_yaml(text).map_err(|e| e.to_string())
            }
            PipelineStage::Scope(path) => Ok(resolve(&input, path)),
            PipelineStage::Project(assignments) => {
                map_records(input, |record| project(record, assignments))
            }
            PipelineStage::ProjectAway(fields) => {
                map_records(input, |record| Ok(project_away(record, fields)))
            }
            PipelineStage::Extend(assignments) => {
                map_records(input, |record| extend(record, assignments))
            }
            PipelineStage::Summarize { aggregates, by } => {
                Ok(Value::Array(summarize(&rows_of(input), aggregates, by)))
            }
            PipelineStage::MvExpand(field) => mv_expand(rows_of(input), field).map(Value::Array),
            PipelineStage::OrderBy(keys) => Ok(Value::Array(order_by(rows_of(input), keys))),
            PipelineStage::Limit(n) => Ok(Value::Array(rows_of(input).into_iter().take(*n).collect())),
            PipelineStage::Where(predicate) => Ok(Value::Array(filter_rows(rows_of(input), predicate))),
            PipelineStage::Count => {
                let mut record = Map::new();
                record.insert("count".to_string(), Value::from(rows_of(input).len() as i64));
                Ok(Value::Array(vec![Value::Object(record)]))
            }
            PipelineStage::JsonataExpr(expression) => {
                expression.evaluate(&input).map_err(|e| e.to_string())
            }
        }
    }
}

fn expect_text<'a>(input: &'a Value, verb: &str) -> Result<&'a str, String> {
    input
        .as_str()
        .ok_or_else(|| format!("{} expects text input, found {}", verb, input.type_name()))
}

/// Apply a record-wise function to each element of an array or to a single value
pub(crate) fn map_records<F>(input: Value, mut f: F) -> Result<Value, String>
where
    F: FnMut(Value) -> Result<Value, String>,
{
    match input {
        Value::Array(items) => items.into_iter().map(f).collect::<Result<Vec<_>, _>>().map(Value::Array),
        Value::Null => Ok(Value::Null),
        other => f(other),
    }
}

/// Ordered list of stages executed as a fold over a value
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    name: String,
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    /// Create an empty pipeline with the given name
    pub fn new(name: &str) -> Self {
        Pipeline {
            name: name.to_string(),
            stages: Vec::new(),
        }
    }

    /// Add a stage to the pipeline
    pub fn add(mut self, stage: PipelineStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Parse pipeline text into stages
    pub fn parse(source: &str) -> Result<Self, PipelineError> {
        Self::parse_with(source, &CsvOptions::default())
    }

    /// Parse pipeline text; `parse-csv` stages start from `csv_defaults`
    pub fn parse_with(source: &str, csv_defaults: &CsvOptions) -> Result<Self, PipelineError> {
        let stages = parse_pipeline_with(source, csv_defaults)?;
        Ok(Pipeline {
            name: "uql".to_string(),
            stages,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    /// Whether the first stage consumes raw text
    pub fn starts_with_parse(&self) -> bool {
        self.stages.first().map_or(false, PipelineStage::is_parse_stage)
    }

    /// Run every stage in order; the first failure halts execution
    pub fn execute(&self, input: Value, warnings: &mut Warnings) -> Result<Value, PipelineError> {
        let mut current = input;

        for (stage_index, stage) in self.stages.iter().enumerate() {
            current = stage
                .apply(current, warnings)
                .map_err(|reason| PipelineError::StageFailed { stage_index, reason })?;
            log::debug!(
                "pipeline '{}' stage {} ({}) produced {}",
                self.name,
                stage_index,
                stage.verb(),
                current.type_name()
            );
        }

        Ok(current)
    }
}
