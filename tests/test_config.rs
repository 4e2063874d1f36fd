// Configuration tests
// Author: Gabriel Demetrios Lafis

use std::io::Write;

use tempfile::Builder;

use rust_data_transformation_engine::utils::{AppError, Config};

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
    assert!(config.worker_count() >= 1);
    assert_eq!(Config::load(None).unwrap(), config);
}

#[test]
fn test_load_yaml() {
    let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "server:\n  port: 9000\n  workers: 2\nlogging:\n  level: debug\nengine:\n  csv:\n    delimiter: ';'\n  timestamp_pattern: '%d/%m/%Y'"
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.worker_count(), 2);
    assert_eq!(config.log_level_filter(), log::LevelFilter::Debug);
    assert_eq!(config.engine.csv.delimiter, ';');
    assert!(config.engine.csv.has_header);
    assert_eq!(config.engine.timestamp_pattern.as_deref(), Some("%d/%m/%Y"));
}

#[test]
fn test_load_json() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"server": {{"enable_cors": true, "max_payload_bytes": 1024}}}}"#).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.server.enable_cors);
    assert_eq!(config.server.max_payload_bytes, 1024);
}

#[test]
fn test_rejects_unknown_extension() {
    let file = Builder::new().suffix(".toml").tempfile().unwrap();
    assert!(matches!(Config::from_file(file.path()), Err(AppError::Config(_))));
}

#[test]
fn test_rejects_invalid_values() {
    let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
    writeln!(file, "server:\n  workers: 0").unwrap();
    assert!(matches!(Config::from_file(file.path()), Err(AppError::Config(_))));

    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{{ not json").unwrap();
    assert!(matches!(Config::from_file(file.path()), Err(AppError::Config(_))));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        Config::from_file("/nonexistent/engine.yaml"),
        Err(AppError::Io(_))
    ));
}
