// API request and response models
// Author: Gabriel Demetrios Lafis

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::data::Value;
use crate::query::{EngineDefaults, Payload, QueryRequest};

/// Body of a query call
#[derive(Debug, Clone, Deserialize)]
pub struct QueryBody {
    pub query: QueryRequest,
    /// Raw text, or an already structured JSON document
    #[serde(default)]
    pub payload: JsonValue,
}

impl QueryBody {
    /// Split the body into the request and the engine payload
    pub fn into_parts(self) -> (QueryRequest, Payload) {
        let payload = match self.payload {
            JsonValue::String(text) => Payload::Text(text),
            other => Payload::Structured(Value::from(other)),
        };
        (self.query, payload)
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body returned with every failed call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// State shared by the handlers
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub defaults: EngineDefaults,
}

impl AppState {
    pub fn new(defaults: EngineDefaults) -> Self {
        AppState { defaults }
    }
}
