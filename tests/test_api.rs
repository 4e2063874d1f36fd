// API tests
// Author: Gabriel Demetrios Lafis

use actix_web::{test, web, App};
use serde_json::{json, Value as JsonValue};

use rust_data_transformation_engine::api::{configure, json_config, AppState};

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::default()))
                .app_data(json_config(1024 * 1024))
                .configure(configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health_check() {
    let app = app!();
    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[actix_web::test]
async fn test_query_with_text_payload() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/v1/query")
        .set_json(json!({
            "query": {
                "type": "csv",
                "parser": "uql",
                "uql": "parse-csv | where qty > 1 | project item",
            },
            "payload": "item,qty\npen,3\ncup,1\n"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: JsonValue = test::read_body_json(resp).await;
    assert_eq!(body["table"]["rows"], json!([["pen"]]));
    assert_eq!(body["warnings"], json!([]));
}

#[actix_web::test]
async fn test_query_with_structured_payload() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/v1/query")
        .set_json(json!({
            "query": {
                "parser": "groq",
                "groq": "*[n > 1]{n}",
                "columns": [{"selector": "n", "type": "number"}]
            },
            "payload": [{"n": 1}, {"n": 2}, {"n": 3}]
        }))
        .to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["table"]["rows"], json!([[2.0], [3.0]]));
}

#[actix_web::test]
async fn test_engine_errors_are_bad_requests() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/v1/query")
        .set_json(json!({
            "query": {"parser": "uql", "uql": "explode things"},
            "payload": []
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

    let body: JsonValue = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("explode"));
}

#[actix_web::test]
async fn test_malformed_body_is_a_bad_request() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/v1/query")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"query\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

    let body: JsonValue = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}
