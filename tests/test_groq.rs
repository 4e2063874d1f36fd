// GROQ tests
// Author: Gabriel Demetrios Lafis

use rust_data_transformation_engine::{
    data::{parse_json, Value},
    groq::{evaluate, parse_query, GroqSyntaxError},
};

fn people() -> Value {
    parse_json(
        r#"[
            {"name": "foo", "age": 19, "city": "paris", "tags": ["a"]},
            {"name": "bar", "age": 25, "city": "rome", "tags": ["a", "b"]},
            {"name": "baz", "age": 31, "tags": []}
        ]"#,
    )
    .unwrap()
}

#[test]
fn test_filter_and_projection() {
    let dataset = parse_json(r#"[{"name": "foo", "age": 19}, {"name": "bar", "age": 20}]"#).unwrap();
    let result = evaluate("*[age>=20]{name}", &dataset).unwrap();
    assert_eq!(result, parse_json(r#"[{"name": "bar"}]"#).unwrap());
}

#[test]
fn test_empty_query_is_identity() {
    assert_eq!(evaluate("", &people()).unwrap(), people());
    assert_eq!(evaluate("   ", &people()).unwrap(), people());
}

#[test]
fn test_boolean_operators_and_defined() {
    let result = evaluate(r#"*[defined(city) && !(city == "rome")]{name}"#, &people()).unwrap();
    assert_eq!(result, parse_json(r#"[{"name": "foo"}]"#).unwrap());

    let result = evaluate(r#"*[age < 20 || name in ["baz"]]{name}"#, &people()).unwrap();
    assert_eq!(result, parse_json(r#"[{"name": "foo"}, {"name": "baz"}]"#).unwrap());

    let result = evaluate(r#"*["b" in tags]{name}"#, &people()).unwrap();
    assert_eq!(result, parse_json(r#"[{"name": "bar"}]"#).unwrap());
}

#[test]
fn test_aliases_and_spread() {
    let result = evaluate(r#"*[name == "foo"]{..., "years": age, "first": tags[0]}"#, &people()).unwrap();
    assert_eq!(result[0]["years"], Value::Number(19.0));
    assert_eq!(result[0]["first"], Value::from("a"));
    assert_eq!(result[0]["city"], Value::from("paris"));
}

#[test]
fn test_index_and_slices() {
    assert_eq!(evaluate("*[1]{name}", &people()).unwrap(), parse_json(r#"{"name": "bar"}"#).unwrap());
    assert!(evaluate("*[-1].name", &people()).is_err());
    assert_eq!(evaluate("*[5]", &people()).unwrap(), Value::Null);

    let inclusive = evaluate("*[0..1]{name}", &people()).unwrap();
    assert_eq!(inclusive.as_array().unwrap().len(), 2);

    let exclusive = evaluate("*[0...1]{name}", &people()).unwrap();
    assert_eq!(exclusive, parse_json(r#"[{"name": "foo"}]"#).unwrap());
}

#[test]
fn test_order() {
    let result = evaluate("*[age > 0] | order(age desc){name}", &people()).unwrap();
    assert_eq!(
        result,
        parse_json(r#"[{"name": "baz"}, {"name": "bar"}, {"name": "foo"}]"#).unwrap()
    );
}

#[test]
fn test_object_dataset_iterates_nested_arrays() {
    let dataset = parse_json(r#"{"meta": {"page": 1}, "items": [{"id": 1}, {"id": 2}]}"#).unwrap();
    let result = evaluate("*[id > 1]", &dataset).unwrap();
    assert_eq!(result, parse_json(r#"[{"id": 2}]"#).unwrap());
}

#[test]
fn test_scalar_dataset_passes_through() {
    let dataset = Value::Number(3.0);
    assert_eq!(evaluate("*", &dataset).unwrap(), dataset);
}

#[test]
fn test_syntax_errors_carry_position() {
    let err: GroqSyntaxError = parse_query("*[age >= ]").unwrap_err();
    assert_eq!(err.position, 9);

    let err = parse_query("people[0]").unwrap_err();
    assert_eq!(err.position, 0);

    assert!(parse_query("*[age > 1").is_err());
}
