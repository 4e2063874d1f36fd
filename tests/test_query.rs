// End-to-end query tests
// Author: Gabriel Demetrios Lafis

use rust_data_transformation_engine::{
    data::{parse_json, Cell, ColumnFormat, ContentType, CsvOptions, ParseError},
    frame::ColumnSpec,
    processing::PipelineError,
    query::{
        apply_root_selector, execute, execute_with, EngineDefaults, EngineError, OutputShape,
        ParserKind, Payload, QueryRequest,
    },
};

const USERS: &str = r#"{
    "users": [
        {"name": "ann", "age": 34, "joined": "2020-01-05T10:00:00Z", "team": "red"},
        {"name": "ben", "age": 27, "joined": "2021-06-01T08:30:00Z", "team": "blue"},
        {"name": "cy", "age": 41, "joined": "2019-11-20T00:00:00Z", "team": "red"}
    ]
}"#;

#[test]
fn test_simple_parser_with_root_selector() {
    let request = QueryRequest::new(ContentType::Json, ParserKind::Simple)
        .with_root_selector("users")
        .with_columns(vec![
            ColumnSpec::new("name", "", ColumnFormat::String),
            ColumnSpec::new("age", "", ColumnFormat::Number),
        ]);

    let response = execute(&request, USERS.into()).unwrap();
    let frame = response.table().unwrap();

    assert_eq!(frame.len(), 3);
    assert_eq!(frame.cell(2, "name"), Some(&Cell::String("cy".to_string())));
    assert_eq!(frame.cell(2, "age"), Some(&Cell::Number(41.0)));
    assert!(response.warnings.is_empty());
}

#[test]
fn test_backend_parser_accepts_bytes_and_derives_columns() {
    let request = QueryRequest::new(ContentType::Json, ParserKind::Backend).with_root_selector("users");
    let response = execute(&request, Payload::Bytes(USERS.as_bytes().to_vec())).unwrap();
    let frame = response.table().unwrap();

    let names: Vec<&str> = frame.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["name", "age", "joined", "team"]);
}

#[test]
fn test_missing_root_yields_empty_table() {
    let request = QueryRequest::new(ContentType::Json, ParserKind::Simple).with_root_selector("nobody.here");
    let response = execute(&request, USERS.into()).unwrap();
    assert!(response.table().unwrap().is_empty());
}

#[test]
fn test_jsonata_root_selector() {
    let value = parse_json(USERS).unwrap();
    let names = apply_root_selector(value, "$.users[age > 30].name").unwrap();
    assert_eq!(names, parse_json(r#"["ann", "cy"]"#).unwrap());
}

#[test]
fn test_uql_over_structured_payload() {
    let request = QueryRequest::new(ContentType::Json, ParserKind::Uql)
        .with_root_selector("users")
        .with_uql("summarize members=count(), oldest=max(age) by team | order by team asc");

    let response = execute(&request, Payload::Structured(parse_json(USERS).unwrap())).unwrap();
    let records = response.table().unwrap().to_records();
    assert_eq!(
        records,
        parse_json(
            r#"[
                {"team": "blue", "members": 1, "oldest": 27},
                {"team": "red", "members": 2, "oldest": 41}
            ]"#
        )
        .unwrap()
    );
}

#[test]
fn test_uql_parse_stage_reads_raw_text() {
    let request = QueryRequest::new(ContentType::Csv, ParserKind::Uql)
        .with_uql("parse-csv | extend total=mul(price, qty) | project item, total")
        .with_columns(vec![
            ColumnSpec::new("item", "", ColumnFormat::String),
            ColumnSpec::new("total", "", ColumnFormat::Number),
        ]);

    let response = execute(&request, "item,price,qty\npen,1.5,4\nbook,12,1\n".into()).unwrap();
    let frame = response.table().unwrap();
    assert_eq!(frame.column_cells("total"), vec![&Cell::Number(6.0), &Cell::Number(12.0)]);
}

#[test]
fn test_groq_parser() {
    let request = QueryRequest::new(ContentType::Yaml, ParserKind::Groq)
        .with_root_selector("users")
        .with_groq(r#"*[team == "red"] | order(age desc){name, age}"#);
    let yaml = "users:\n  - {name: ann, age: 34, team: red}\n  - {name: ben, age: 27, team: blue}\n  - {name: cy, age: 41, team: red}\n";

    let response = execute(&request, yaml.into()).unwrap();
    let frame = response.table().unwrap();
    assert_eq!(
        frame.column_cells("name"),
        vec![&Cell::String("cy".to_string()), &Cell::String("ann".to_string())]
    );
}

#[test]
fn test_timeseries_output() {
    let request = QueryRequest::new(ContentType::Json, ParserKind::Simple)
        .with_root_selector("users")
        .with_output_shape(OutputShape::Timeseries)
        .with_columns(vec![
            ColumnSpec::new("joined", "", ColumnFormat::Timestamp),
            ColumnSpec::new("team", "", ColumnFormat::String),
            ColumnSpec::new("age", "", ColumnFormat::Number),
        ]);

    let response = execute(&request, USERS.into()).unwrap();
    let series = response.timeseries().unwrap();

    assert_eq!(series.len(), 2);
    let red: Vec<Option<f64>> = series.series[0].points.iter().map(|p| p.value).collect();
    assert_eq!(red, vec![Some(41.0), Some(34.0)]);
}

#[test]
fn test_engine_defaults_fill_gaps() {
    let defaults = EngineDefaults {
        csv: CsvOptions::default().with_delimiter(';'),
        timestamp_pattern: Some("%d.%m.%Y".to_string()),
    };
    let request = QueryRequest::new(ContentType::Csv, ParserKind::Simple).with_columns(vec![
        ColumnSpec::new("day", "", ColumnFormat::Timestamp),
        ColumnSpec::new("v", "", ColumnFormat::Number),
    ]);

    let response = execute_with(&request, "day;v\n24.12.2022;3\n".into(), &defaults).unwrap();
    let frame = response.table().unwrap();
    match frame.cell(0, "day") {
        Some(Cell::Timestamp(ts)) => assert_eq!(ts.to_rfc3339(), "2022-12-24T00:00:00+00:00"),
        other => panic!("unexpected cell {:?}", other),
    }
}

#[test]
fn test_request_deserializes_from_json() {
    let request: QueryRequest = serde_json::from_str(
        r#"{
            "type": "csv",
            "parser": "uql",
            "uql": "parse-csv | count",
            "root": "",
            "format": "table",
            "columns": [{"selector": "count", "text": "rows", "type": "number"}]
        }"#,
    )
    .unwrap();

    assert_eq!(request.content_type, ContentType::Csv);
    assert_eq!(request.parser, ParserKind::Uql);
    assert_eq!(request.columns[0].name(), "rows");

    let response = execute(&request, "a\n1\n2\n".into()).unwrap();
    assert_eq!(response.table().unwrap().cell(0, "rows"), Some(&Cell::Number(2.0)));
}

#[test]
fn test_validation_errors() {
    let request = QueryRequest::new(ContentType::Json, ParserKind::Uql);
    assert!(matches!(
        execute(&request, "[]".into()),
        Err(EngineError::InvalidRequest(_))
    ));

    let request = QueryRequest::new(ContentType::Json, ParserKind::Simple)
        .with_output_shape(OutputShape::Timeseries)
        .with_columns(vec![ColumnSpec::new("v", "", ColumnFormat::Number)]);
    assert!(matches!(
        execute(&request, "[]".into()),
        Err(EngineError::InvalidRequest(_))
    ));
}

#[test]
fn test_errors_are_typed() {
    let request = QueryRequest::new(ContentType::Json, ParserKind::Simple);
    assert!(matches!(
        execute(&request, "{oops".into()),
        Err(EngineError::Parse(ParseError::Syntax { .. }))
    ));

    let request = QueryRequest::new(ContentType::Json, ParserKind::Uql).with_uql("shuffle");
    assert!(matches!(
        execute(&request, "[]".into()),
        Err(EngineError::Pipeline(PipelineError::UnknownVerb { .. }))
    ));

    let request = QueryRequest::new(ContentType::Json, ParserKind::Groq).with_groq("*[");
    assert!(matches!(execute(&request, "[]".into()), Err(EngineError::Groq(_))));
}

#[test]
fn test_response_serialization() {
    let request = QueryRequest::new(ContentType::Json, ParserKind::Simple)
        .with_columns(vec![ColumnSpec::new("v", "", ColumnFormat::Number)]);
    let response = execute(&request, r#"[{"v": 1}]"#.into()).unwrap();

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["table"]["columns"][0]["name"], "v");
    assert_eq!(json["table"]["columns"][0]["type"], "number");
    assert_eq!(json["table"]["rows"][0][0], 1.0);
    assert_eq!(json["warnings"], serde_json::json!([]));
}

#[test]
fn test_root_selector_narrows_to_users() {
    let request = QueryRequest::new(ContentType::Json, ParserKind::Simple)
        .with_root_selector("users")
        .with_columns(vec![ColumnSpec::parse("name::string").unwrap()]);

    let response = execute(&request, r#"{"id": "hello", "users": [{"name": "foo"}]}"#.into()).unwrap();
    let frame = response.table().unwrap();
    assert_eq!(frame.len(), 1);
    assert_eq!(frame.rows[0].cells, vec![Cell::String("foo".to_string())]);
}

#[test]
fn test_csv_number_with_group_separators() {
    let request = QueryRequest::new(ContentType::Csv, ParserKind::Simple).with_columns(vec![
        ColumnSpec::new("key", "", ColumnFormat::String),
        ColumnSpec::new("value", "", ColumnFormat::Number),
    ]);

    let response = execute(&request, "key,value\n\"number with comma\",\"123,456.78\"".into()).unwrap();
    let frame = response.table().unwrap();
    assert_eq!(frame.cell(0, "value"), Some(&Cell::Number(123456.78)));
    assert_eq!(frame.cell(0, "key"), Some(&Cell::String("number with comma".to_string())));
}
