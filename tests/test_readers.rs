// Payload reader tests
// Author: Gabriel Demetrios Lafis

use rust_data_transformation_engine::data::{
    parse_json, parse_number, read_payload, resolve, ContentType, CsvOptions, ParseError, Value,
    Warnings,
};

fn read(raw: &str, content_type: ContentType, options: &CsvOptions) -> (Result<Value, ParseError>, Warnings) {
    let mut warnings = Warnings::new();
    let result = read_payload(raw.as_bytes(), content_type, options, &mut warnings);
    (result, warnings)
}

#[test]
fn test_json_keeps_key_order() {
    let (value, _) = read(r#"{"b": 1, "a": {"z": true, "y": null}}"#, ContentType::Json, &CsvOptions::default());
    let value = value.unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["b", "a"]);
    assert_eq!(resolve(&value, "a.z"), Value::Bool(true));
}

#[test]
fn test_json_syntax_error() {
    let (result, _) = read(r#"{"a": [1, 2}"#, ContentType::Json, &CsvOptions::default());
    assert!(matches!(result, Err(ParseError::Syntax { .. })));
}

#[test]
fn test_csv_reads_rows_by_header() {
    let raw = "name,amount\nalice,\"123,456.78\"\nbob,\n";
    let (value, warnings) = read(raw, ContentType::Csv, &CsvOptions::default());
    let value = value.unwrap();

    assert!(warnings.is_empty());
    assert_eq!(value[0]["name"], Value::from("alice"));
    assert_eq!(value[0]["amount"], Value::from("123,456.78"));
    assert_eq!(value[1]["amount"], Value::Null);
    assert_eq!(parse_number(value[0]["amount"].as_str().unwrap()), Some(123456.78));
}

#[test]
fn test_tsv_and_explicit_headers() {
    let options = CsvOptions {
        has_header: false,
        headers: vec!["a".to_string(), "b".to_string()],
        ..CsvOptions::default()
    };
    let (value, _) = read("1\t2\n3\t4\n", ContentType::Tsv, &options);
    assert_eq!(
        value.unwrap(),
        parse_json(r#"[{"a": "1", "b": "2"}, {"a": "3", "b": "4"}]"#).unwrap()
    );
}

#[test]
fn test_csv_malformed_quote_is_fatal() {
    let raw = "name,age\nalice,30\nbo\"b,25\ncarol,40\n";
    let (result, _) = read(raw, ContentType::Csv, &CsvOptions::default());
    match result {
        Err(ParseError::Csv { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected a CSV error, got {:?}", other),
    }
}

#[test]
fn test_csv_malformed_quote_is_skipped() {
    let raw = "name,age\nalice,30\nbo\"b,25\ncarol,40\n";
    let options = CsvOptions::default().skip_lines_with_error(true);
    let (value, warnings) = read(raw, ContentType::Csv, &options);

    let value = value.unwrap();
    assert_eq!(value.as_array().unwrap().len(), 2);
    assert_eq!(value[1]["name"], Value::from("carol"));
    assert_eq!(warnings.len(), 1);
}

#[test]
fn test_csv_column_count() {
    let raw = "a,b\n1,2\n3\n";
    let (result, _) = read(raw, ContentType::Csv, &CsvOptions::default());
    assert!(matches!(result, Err(ParseError::Csv { line: 3, .. })));

    let options = CsvOptions::default().relax_column_count(true);
    let (value, _) = read(raw, ContentType::Csv, &options);
    assert_eq!(value.unwrap()[1], parse_json(r#"{"a": "3"}"#).unwrap());
}

#[test]
fn test_csv_comments_and_empty_lines() {
    let options = CsvOptions {
        comment: Some('#'),
        skip_empty_lines: true,
        ..CsvOptions::default()
    };
    let raw = "a,b\n# note\n1,2\n,\n3,4\n";
    let (value, _) = read(raw, ContentType::Csv, &options);
    assert_eq!(value.unwrap().as_array().unwrap().len(), 2);
}

#[test]
fn test_csv_whitespace_line_is_skipped() {
    let options = CsvOptions {
        skip_empty_lines: true,
        ..CsvOptions::default()
    };
    let (value, warnings) = read("a,b\n1,2\n   \n3,4\n", ContentType::Csv, &options);
    let value = value.unwrap();
    assert_eq!(value.as_array().unwrap().len(), 2);
    assert_eq!(value[1], parse_json(r#"{"a": "3", "b": "4"}"#).unwrap());
    assert!(warnings.is_empty());

    // Without the flag the short record is a column count error
    let (result, _) = read("a,b\n1,2\n   \n3,4\n", ContentType::Csv, &CsvOptions::default());
    assert!(matches!(result, Err(ParseError::Csv { line: 3, .. })));
}

#[test]
fn test_xml_repeated_siblings_become_arrays() {
    let raw = r#"<rss version="2.0"><channel><title>news</title><item><title>a</title></item><item><title>b</title><link href="x"/></item></channel></rss>"#;
    let (value, _) = read(raw, ContentType::Xml, &CsvOptions::default());
    let value = value.unwrap();

    assert_eq!(resolve(&value, "rss.@version"), Value::from("2.0"));
    assert_eq!(resolve(&value, "rss.channel.title"), Value::from("news"));

    let items = resolve(&value, "rss.channel.item");
    assert_eq!(items.as_array().unwrap().len(), 2);
    assert_eq!(items[1]["title"], Value::from("b"));
    assert_eq!(resolve(&items, "[1].link.@href"), Value::from("x"));
}

#[test]
fn test_xml_mismatched_tag_is_an_error() {
    let (result, _) = read("<a><b></a>", ContentType::Xml, &CsvOptions::default());
    assert!(matches!(result, Err(ParseError::Xml { .. })));
}

#[test]
fn test_html_is_lenient() {
    let raw = "<html><body><p>one<br>two</p><img src=\"a.png\"></body></html>";
    let (value, _) = read(raw, ContentType::Html, &CsvOptions::default());
    let value = value.unwrap();
    assert_eq!(resolve(&value, "html.body.img.@src"), Value::from("a.png"));
}

#[test]
fn test_yaml() {
    let raw = "users:\n  - name: ann\n    age: 31\n  - name: ben\n    age: 27\n";
    let (value, _) = read(raw, ContentType::Yaml, &CsvOptions::default());
    let value = value.unwrap();
    assert_eq!(resolve(&value, "users[1].age"), Value::Number(27.0));
}

#[test]
fn test_graphql_errors() {
    let partial = r#"{"data": {"hero": {"name": "R2"}}, "errors": [{"message": "friends unavailable"}]}"#;
    let (value, warnings) = read(partial, ContentType::GraphQl, &CsvOptions::default());
    assert_eq!(resolve(&value.unwrap(), "data.hero.name"), Value::from("R2"));
    assert_eq!(warnings.as_slice(), &["GraphQL error: friends unavailable".to_string()]);

    let failed = r#"{"data": null, "errors": [{"message": "boom"}]}"#;
    let (result, _) = read(failed, ContentType::GraphQl, &CsvOptions::default());
    assert_eq!(
        result,
        Err(ParseError::GraphQl {
            messages: vec!["boom".to_string()]
        })
    );
}

#[test]
fn test_invalid_utf8() {
    let mut warnings = Warnings::new();
    let result = read_payload(&[0xff, 0xfe, 0x00], ContentType::Json, &CsvOptions::default(), &mut warnings);
    assert!(matches!(result, Err(ParseError::Encoding(_))));
}

#[test]
fn test_content_type_names() {
    assert_eq!(ContentType::from_name("text/csv"), Some(ContentType::Csv));
    assert_eq!(ContentType::from_name("application/json"), Some(ContentType::Json));
    assert_eq!(ContentType::from_name("yml"), Some(ContentType::Yaml));
    assert_eq!(ContentType::from_name("parquet"), None);
}
