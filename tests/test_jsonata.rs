// JSONata expression tests
// Author: Gabriel Demetrios Lafis

use rust_data_transformation_engine::{
    data::{parse_json, Value},
    processing::jsonata::{evaluate, Expression},
};

fn shop() -> Value {
    parse_json(
        r#"{
            "name": "corner",
            "items": [
                {"sku": "a", "price": 3, "tags": ["x"]},
                {"sku": "b", "price": 7, "tags": ["y", "z"]},
                {"sku": "c", "price": 12}
            ]
        }"#,
    )
    .unwrap()
}

#[test]
fn test_paths_map_over_arrays() {
    assert_eq!(evaluate("items.sku", &shop()).unwrap(), parse_json(r#"["a", "b", "c"]"#).unwrap());
    assert_eq!(evaluate("items.tags", &shop()).unwrap(), parse_json(r#"["x", "y", "z"]"#).unwrap());
    assert_eq!(evaluate("missing.field", &shop()).unwrap(), Value::Null);
}

#[test]
fn test_predicates() {
    assert_eq!(evaluate("items[price > 5].sku", &shop()).unwrap(), parse_json(r#"["b", "c"]"#).unwrap());
    assert_eq!(evaluate("items[0].sku", &shop()).unwrap(), Value::from("a"));
    assert_eq!(evaluate("items[-1].sku", &shop()).unwrap(), Value::from("c"));
    // A single match collapses unless forced into an array
    assert_eq!(evaluate("items[sku = 'b'].price", &shop()).unwrap(), Value::Number(7.0));
    let forced = evaluate("items[sku = 'b'][]", &shop()).unwrap();
    assert_eq!(forced.as_array().map(Vec::len), Some(1));
}

#[test]
fn test_functions_and_operators() {
    assert_eq!(evaluate("$sum(items.price)", &shop()).unwrap(), Value::Number(22.0));
    assert_eq!(evaluate("$count(items)", &shop()).unwrap(), Value::Number(3.0));
    assert_eq!(evaluate("$max(items.price) - $min(items.price)", &shop()).unwrap(), Value::Number(9.0));
    assert_eq!(
        evaluate("$uppercase(name) & '-' & $join(items.sku, '')", &shop()).unwrap(),
        Value::from("CORNER-abc")
    );
    assert_eq!(evaluate("$exists(items[0].tags)", &shop()).unwrap(), Value::Bool(true));
    assert_eq!(evaluate("items[2].price > 10 ? 'big' : 'small'", &shop()).unwrap(), Value::from("big"));
}

#[test]
fn test_constructors() {
    let result = evaluate("items.{'id': sku, 'cost': price * 2}", &shop()).unwrap();
    assert_eq!(result[1], parse_json(r#"{"id": "b", "cost": 14}"#).unwrap());

    let result = evaluate("[name, $count(items)]", &shop()).unwrap();
    assert_eq!(result, parse_json(r#"["corner", 3]"#).unwrap());
}

#[test]
fn test_errors() {
    let err = Expression::parse("items[").unwrap_err();
    assert_eq!(err.position, 6);

    assert!(Expression::parse("$frobnicate(items)").is_err());
    assert!(evaluate("name * 2", &shop()).is_err());
}

#[test]
fn test_parsed_expression_is_reusable() {
    let expression = Expression::parse("$sum(price)").unwrap();
    assert_eq!(expression.source(), "$sum(price)");

    let a = parse_json(r#"[{"price": 1}, {"price": 2}]"#).unwrap();
    let b = parse_json(r#"{"price": 5}"#).unwrap();
    assert_eq!(expression.evaluate(&a).unwrap(), Value::Number(3.0));
    assert_eq!(expression.evaluate(&b).unwrap(), Value::Number(5.0));
}
