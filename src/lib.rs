// Rust Data Transformation Engine
// Author: Gabriel Demetrios Lafis

//! # Rust Data Transformation Engine
//!
//! Turns heterogeneous payloads into typed tables and time series.
//!
//! ## Features
//!
//! - Payload readers for JSON, CSV/TSV, XML/HTML, YAML and GraphQL responses
//! - A pipe-delimited query language (`uql`) with summarize, mv-expand and friends
//! - GROQ filtering and projection
//! - JSONata expressions inside pipelines and as root selectors
//! - Column extraction with string, number and timestamp coercion
//! - REST API for remote access
//!
//! ## Example
//!
//! ```rust
//! use rust_data_transformation_engine::data::{ColumnFormat, ContentType};
//! use rust_data_transformation_engine::frame::ColumnSpec;
//! use rust_data_transformation_engine::query::{execute, ParserKind, QueryRequest};
//!
//! let request = QueryRequest::new(ContentType::Csv, ParserKind::Uql)
//!     .with_uql("parse-csv | where age > 20 | project name, age")
//!     .with_columns(vec![
//!         ColumnSpec::new("name", "", ColumnFormat::String),
//!         ColumnSpec::new("age", "", ColumnFormat::Number),
//!     ]);
//!
//! let response = execute(&request, "name,age\nalice,30\nbob,18\n".into()).unwrap();
//! let frame = response.table().unwrap();
//! assert_eq!(frame.len(), 1);
//! ```

pub mod api;
pub mod data;
pub mod frame;
pub mod groq;
pub mod lexer;
pub mod processing;
pub mod query;
pub mod utils;

// Re-export main types
pub use api::Server;
pub use data::{ContentType, Value};
pub use frame::{ColumnSpec, Frame, SeriesSet};
pub use processing::Pipeline;
pub use query::{execute, execute_with, Payload, QueryRequest, QueryResponse};
pub use utils::Config;
