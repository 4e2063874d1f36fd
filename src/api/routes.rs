// API routes configuration
// Author: Gabriel Demetrios Lafis

use actix_web::{error, web};

use super::{handlers, ApiError};

/// Configure API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/query", web::post().to(handlers::run_query)),
    );
}

/// JSON extractor settings; malformed bodies answer with the error body shape
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let message = err.to_string();
            error::Error::from(ApiError::BadRequest(message))
        })
}
