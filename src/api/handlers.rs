// API request handlers
// Author: Gabriel Demetrios Lafis

use actix_web::{web, HttpResponse};

use crate::query::execute_with;

use super::{ApiError, AppState, HealthResponse, QueryBody};

/// Health check
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Run one query; the engine work happens on the blocking pool
pub async fn run_query(
    state: web::Data<AppState>,
    body: web::Json<QueryBody>,
) -> Result<HttpResponse, ApiError> {
    let (request, payload) = body.into_inner().into_parts();
    let defaults = state.defaults.clone();

    log::debug!("query request: parser {:?}, shape {:?}", request.parser, request.output_shape);

    let response = web::block(move || execute_with(&request, payload, &defaults))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    if !response.warnings.is_empty() {
        log::info!("query finished with {} warning(s)", response.warnings.len());
    }

    Ok(HttpResponse::Ok().json(response))
}
