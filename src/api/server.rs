// API server implementation
// Author: Gabriel Demetrios Lafis

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

use crate::utils::Config;

use super::{json_config, routes, AppState};

/// API server
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new API server
    pub fn new(config: Config) -> Self {
        Server { config }
    }

    /// Run the API server until it is stopped
    pub async fn run(&self) -> std::io::Result<()> {
        let host = self.config.server.host.clone();
        let port = self.config.server.port;
        let workers = self.config.worker_count();
        let enable_cors = self.config.server.enable_cors;
        let limit = self.config.server.max_payload_bytes;
        let state = web::Data::new(AppState::new(self.config.engine.clone()));

        log::info!("starting server at http://{}:{} with {} workers", host, port, workers);

        HttpServer::new(move || {
            let cors = if enable_cors {
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600)
            } else {
                Cors::default()
            };

            App::new()
                .wrap(cors)
                .app_data(state.clone())
                .app_data(json_config(limit))
                .configure(routes::configure)
        })
        .workers(workers)
        .bind((host.as_str(), port))?
        .run()
        .await
    }
}
