// API server example
// Author: Gabriel Demetrios Lafis

use rust_data_transformation_engine::{
    api::Server,
    utils::{init_logging, Config},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    init_logging(log::LevelFilter::Info).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let mut config = Config::default();
    config.server.enable_cors = true;

    println!("Starting API server at http://{}:{}", config.server.host, config.server.port);
    println!("Try: curl -X POST http://127.0.0.1:8080/api/v1/query -H 'content-type: application/json' \\");
    println!("       -d '{{\"query\": {{\"parser\": \"groq\", \"groq\": \"*[n > 1]\"}}, \"payload\": [{{\"n\": 1}}, {{\"n\": 2}}]}}'");
    println!("Press Ctrl+C to stop");

    Server::new(config).run().await
}
