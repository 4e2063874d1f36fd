// Pipeline tests
// Author: Gabriel Demetrios Lafis

use rust_data_transformation_engine::{
    data::{parse_json, CsvOptions, Value, Warnings},
    processing::{Pipeline, PipelineError, PipelineStage},
};

fn cities() -> Value {
    parse_json(
        r#"[
            {"city": "tokyo", "country": "japan", "population": 200},
            {"city": "delhi", "country": "india", "population": 180},
            {"city": "new york", "country": "usa", "population": 60},
            {"city": "mumbai", "country": "india", "population": 150},
            {"city": "chicago", "country": "usa", "population": 40}
        ]"#,
    )
    .unwrap()
}

fn run(source: &str, input: Value) -> Value {
    let pipeline = Pipeline::parse(source).unwrap();
    let mut warnings = Warnings::new();
    pipeline.execute(input, &mut warnings).unwrap()
}

#[test]
fn test_summarize_by_country() {
    let result = run(
        "summarize count(), sum(population) by country | order by sum desc",
        cities(),
    );

    let expected = parse_json(
        r#"[
            {"country": "india", "count": 2, "sum": 330},
            {"country": "japan", "count": 1, "sum": 200},
            {"country": "usa", "count": 2, "sum": 100}
        ]"#,
    )
    .unwrap();
    assert_eq!(result, expected);
}

#[test]
fn test_summarize_aliases_and_empty_input() {
    let result = run("summarize total=sum(population), avg_pop=avg(population)", cities());
    assert_eq!(result[0]["total"], Value::Number(630.0));
    assert_eq!(result[0]["avg_pop"], Value::Number(126.0));

    let empty = run("summarize count(), max(population)", Value::Array(vec![]));
    assert_eq!(empty, parse_json(r#"[{"count": 0, "max": null}]"#).unwrap());
}

#[test]
fn test_where_project_and_limit() {
    let result = run(
        "where population >= 100 and country != 'japan' | project name=city, population | limit 1",
        cities(),
    );
    assert_eq!(result, parse_json(r#"[{"name": "delhi", "population": 180}]"#).unwrap());
}

#[test]
fn test_where_string_operators() {
    let result = run("where city contains 'YOR' or city startswith 'chi' | count", cities());
    assert_eq!(result, parse_json(r#"[{"count": 2}]"#).unwrap());

    let result = run("where country in ('india', 'usa') | where city !endswith 'i' | count", cities());
    assert_eq!(result, parse_json(r#"[{"count": 2}]"#).unwrap());
}

#[test]
fn test_extend_with_functions() {
    let input = parse_json(r#"{"first": " ada ", "last": "lovelace", "score": "12.3456"}"#).unwrap();
    let result = run(
        "extend first=trim(first), full=strcat(toupper(trim(first)), ' ', last), score=round(score, 2), len=strlen(last)",
        input,
    );

    assert_eq!(result["first"], Value::from("ada"));
    assert_eq!(result["full"], Value::from("ADA lovelace"));
    assert_eq!(result["score"], Value::Number(12.35));
    assert_eq!(result["len"], Value::Number(8.0));

    // Existing keys keep their position
    let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["first", "last", "score", "full", "len"]);
}

#[test]
fn test_project_away_and_scope() {
    let input = parse_json(r#"{"data": {"items": [{"a": 1, "b": 2, "c": 3}]}}"#).unwrap();
    let result = run("scope data.items | project-away b, c", input);
    assert_eq!(result, parse_json(r#"[{"a": 1}]"#).unwrap());
}

#[test]
fn test_mv_expand() {
    let input = parse_json(
        r#"[
            {"name": "a", "tags": ["x", "y"]},
            {"name": "b", "tags": []},
            {"name": "c", "tags": "z"}
        ]"#,
    )
    .unwrap();

    let result = run("mv-expand tags | project name, tags", input);
    let expected = parse_json(
        r#"[
            {"name": "a", "tags": "x"},
            {"name": "a", "tags": "y"},
            {"name": "c", "tags": "z"}
        ]"#,
    )
    .unwrap();
    assert_eq!(result, expected);
}

#[test]
fn test_order_by_puts_nulls_last() {
    let input = parse_json(r#"[{"v": 2}, {"v": null}, {"v": 10}, {"v": 1}]"#).unwrap();

    let asc = run("order by v asc", input.clone());
    assert_eq!(asc, parse_json(r#"[{"v": 1}, {"v": 2}, {"v": 10}, {"v": null}]"#).unwrap());

    let desc = run("sort by v desc", input);
    assert_eq!(desc, parse_json(r#"[{"v": 10}, {"v": 2}, {"v": 1}, {"v": null}]"#).unwrap());
}

#[test]
fn test_parse_csv_stage() {
    let text = Value::from("name;age\nalice;30\nbob;18\n");
    let result = run("parse-csv delimiter=';' | where age > 20 | project name", text);
    assert_eq!(result, parse_json(r#"[{"name": "alice"}]"#).unwrap());
}

#[test]
fn test_parse_csv_stage_uses_defaults() {
    let defaults = CsvOptions::default().with_delimiter('|');
    let pipeline = Pipeline::parse_with("parse-csv", &defaults).unwrap();
    match &pipeline.stages()[0] {
        PipelineStage::ParseCsv(options) => assert_eq!(options.delimiter, '|'),
        other => panic!("unexpected stage {:?}", other),
    }
    assert!(pipeline.starts_with_parse());
}

#[test]
fn test_jsonata_stage() {
    let input = parse_json(r#"{"orders": [{"price": 10, "qty": 2}, {"price": 5, "qty": 4}]}"#).unwrap();
    let result = run(r#"jsonata "$sum(orders.(price * qty))""#, input);
    assert_eq!(result, Value::Number(40.0));
}

#[test]
fn test_builder_pipeline() {
    let pipeline = Pipeline::new("manual")
        .add(PipelineStage::ParseJson)
        .add(PipelineStage::Limit(2))
        .add(PipelineStage::Count);

    let mut warnings = Warnings::new();
    let result = pipeline
        .execute(Value::from(r#"[1, 2, 3]"#), &mut warnings)
        .unwrap();
    assert_eq!(pipeline.name(), "manual");
    assert_eq!(result, parse_json(r#"[{"count": 2}]"#).unwrap());
}

#[test]
fn test_unknown_verb() {
    let err = Pipeline::parse("where a == 1 | explode a").unwrap_err();
    assert_eq!(
        err,
        PipelineError::UnknownVerb {
            verb: "explode".to_string(),
            position: 15,
        }
    );
}

#[test]
fn test_unknown_function() {
    let err = Pipeline::parse("extend x=frobnicate(a)").unwrap_err();
    match err {
        PipelineError::UnknownFunction { name, position } => {
            assert_eq!(name, "frobnicate");
            assert_eq!(position, 9);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_syntax_error() {
    assert!(matches!(
        Pipeline::parse("limit many"),
        Err(PipelineError::Syntax { .. })
    ));
    assert!(matches!(
        Pipeline::parse("order city"),
        Err(PipelineError::Syntax { .. })
    ));
}

#[test]
fn test_stage_failure_halts_pipeline() {
    let pipeline = Pipeline::parse("count | parse-yaml | limit 1").unwrap();
    let mut warnings = Warnings::new();
    let err = pipeline.execute(cities(), &mut warnings).unwrap_err();
    match err {
        PipelineError::StageFailed { stage_index, .. } => assert_eq!(stage_index, 1),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_extend_sees_earlier_assignments() {
    let input = parse_json(r#"[{"price": 4, "qty": 3}]"#).unwrap();
    let result = run("extend total=mul(price, qty), shipped=sum(total, 1)", input);

    assert_eq!(result[0]["total"], Value::Number(12.0));
    assert_eq!(result[0]["shipped"], Value::Number(13.0));
}

#[test]
fn test_record_verbs_reject_scalars() {
    let input = parse_json(r#"["x", "y"]"#).unwrap();

    for source in ["project a", "extend a=strlen(a)", "mv-expand a"] {
        let pipeline = Pipeline::parse(source).unwrap();
        let mut warnings = Warnings::new();
        match pipeline.execute(input.clone(), &mut warnings) {
            Err(PipelineError::StageFailed { stage_index, reason }) => {
                assert_eq!(stage_index, 0);
                assert!(reason.contains("expects records"), "{}", reason);
            }
            other => panic!("{} gave {:?}", source, other),
        }
    }
}
