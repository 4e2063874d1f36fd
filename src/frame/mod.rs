// Frame module for typed table and time series output
// Author: Gabriel Demetrios Lafis

mod table;
mod timeseries;

pub use table::*;
pub use timeseries::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{Cell, ColumnFormat, ColumnType, Map, Value};

/// Declarative description of one output column
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    pub selector: String,
    #[serde(alias = "text")]
    pub alias: String,
    #[serde(rename = "type", alias = "format")]
    pub format: ColumnFormat,
    pub timestamp_pattern: Option<String>,
}

impl ColumnSpec {
    /// Create a new column spec
    pub fn new(selector: &str, alias: &str, format: ColumnFormat) -> Self {
        ColumnSpec {
            selector: selector.to_string(),
            alias: alias.to_string(),
            format,
            timestamp_pattern: None,
        }
    }

    /// Set the layout used to parse textual timestamps
    pub fn with_timestamp_pattern(mut self, pattern: &str) -> Self {
        self.timestamp_pattern = Some(pattern.to_string());
        self
    }

    /// Output name: the alias, or the selector when no alias is given
    pub fn name(&self) -> &str {
        if self.alias.trim().is_empty() {
            &self.selector
        } else {
            &self.alias
        }
    }

    /// Parse the compact `selector:alias:format` notation
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.splitn(3, ':');
        let selector = parts.next()?.trim();
        let alias = parts.next().unwrap_or_default().trim();
        let format = match parts.next() {
            Some(name) => ColumnFormat::from_name(name)?,
            None => ColumnFormat::String,
        };
        Some(ColumnSpec::new(selector, alias, format))
    }
}

/// Column of a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Row of cells index-aligned with the frame columns
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    /// Create a new row with the given cells
    pub fn new(cells: Vec<Cell>) -> Self {
        Row { cells }
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }
}

/// Column-oriented table result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    pub columns: Vec<FrameColumn>,
    pub rows: Vec<Row>,
}

impl Frame {
    /// Create a new empty frame
    pub fn new(name: &str, columns: Vec<FrameColumn>) -> Self {
        Frame {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get a cell by row index and column name
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// All cells of one column
    pub fn column_cells(&self, column: &str) -> Vec<&Cell> {
        match self.column_index(column) {
            Some(index) => self.rows.iter().filter_map(|row| row.get(index)).collect(),
            None => Vec::new(),
        }
    }

    /// Convert the frame back into an array of records
    pub fn to_records(&self) -> Value {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let record: Map = self
                    .columns
                    .iter()
                    .zip(&row.cells)
                    .map(|(column, cell)| (column.name.clone(), cell.to_value()))
                    .collect();
                Value::Object(record)
            })
            .collect();
        Value::Array(records)
    }
}

/// Point of a time series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// One series: the dimension values identifying it and its ordered points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: Vec<Cell>,
    pub field: String,
    pub points: Vec<SeriesPoint>,
}

/// Time-indexed, dimension-keyed result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSet {
    pub name: String,
    pub time_field: String,
    pub dimensions: Vec<String>,
    pub series: Vec<Series>,
}

impl SeriesSet {
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Represents an error raised while assembling output
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("invalid time series: {0}")]
    InvalidTimeSeries(String),
}
