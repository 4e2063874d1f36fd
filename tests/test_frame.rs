// Frame assembly tests
// Author: Gabriel Demetrios Lafis

use chrono::{TimeZone, Utc};

use rust_data_transformation_engine::{
    data::{coerce, parse_json, Cell, ColumnFormat, ColumnType, Value, Warnings},
    frame::{to_table, to_timeseries, ColumnSpec, FrameError},
};

fn rows(json: &str) -> Vec<Value> {
    match parse_json(json).unwrap() {
        Value::Array(items) => items,
        other => vec![other],
    }
}

#[test]
fn test_derived_columns_follow_first_row() {
    let rows = rows(r#"[{"b": 1, "a": "x"}, {"a": "y", "b": 2, "c": true}]"#);
    let mut warnings = Warnings::new();
    let frame = to_table(&rows, &[], &mut warnings);

    let names: Vec<&str> = frame.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
    assert_eq!(frame.columns[0].column_type, ColumnType::Number);
    assert_eq!(frame.cell(1, "a"), Some(&Cell::String("y".to_string())));
    assert_eq!(frame.cell(1, "c"), None);
}

#[test]
fn test_declared_columns_keep_declared_order() {
    let rows = rows(r#"[{"user": {"name": "ann"}, "score": "1,234.5"}]"#);
    let columns = vec![
        ColumnSpec::new("score", "points", ColumnFormat::Number),
        ColumnSpec::new("user.name", "", ColumnFormat::String),
        ColumnSpec::new("missing", "", ColumnFormat::String),
    ];
    let mut warnings = Warnings::new();
    let frame = to_table(&rows, &columns, &mut warnings);

    let names: Vec<&str> = frame.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["points", "user.name", "missing"]);
    assert_eq!(frame.cell(0, "points"), Some(&Cell::Number(1234.5)));
    assert_eq!(frame.cell(0, "user.name"), Some(&Cell::String("ann".to_string())));
    assert_eq!(frame.cell(0, "missing"), Some(&Cell::Null));
    assert!(warnings.is_empty());
}

#[test]
fn test_failed_number_coercion_is_null_with_warning() {
    let rows = rows(r#"[{"v": "12abc"}, {"v": "7"}]"#);
    let columns = vec![ColumnSpec::new("v", "", ColumnFormat::Number)];
    let mut warnings = Warnings::new();
    let frame = to_table(&rows, &columns, &mut warnings);

    assert_eq!(frame.column_cells("v"), vec![&Cell::Null, &Cell::Number(7.0)]);
    assert_eq!(warnings.len(), 1);
}

#[test]
fn test_timestamp_coercion() {
    let expected = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();

    let iso = coerce(&Value::from("2021-03-04T05:06:07Z"), ColumnFormat::Timestamp, None);
    assert_eq!(iso, Cell::Timestamp(expected));

    let millis = coerce(&Value::Number(expected.timestamp_millis() as f64), ColumnFormat::Timestamp, None);
    assert_eq!(millis, Cell::Timestamp(expected));

    let seconds = coerce(
        &Value::Number(expected.timestamp() as f64),
        ColumnFormat::TimestampEpochSeconds,
        None,
    );
    assert_eq!(seconds, Cell::Timestamp(expected));

    assert_eq!(coerce(&Value::from("not a date"), ColumnFormat::Timestamp, None), Cell::Null);
}

#[test]
fn test_timestamp_pattern_takes_precedence() {
    // Day-first text the built-in layouts do not read
    let value = Value::from("04/03/2021");
    let cell = coerce(&value, ColumnFormat::Timestamp, Some("%d/%m/%Y"));
    assert_eq!(cell, Cell::Timestamp(Utc.with_ymd_and_hms(2021, 3, 4, 0, 0, 0).unwrap()));

    let fallback = coerce(&Value::from("2021-03-04"), ColumnFormat::Timestamp, Some("%d/%m/%Y"));
    assert_eq!(fallback, Cell::Timestamp(Utc.with_ymd_and_hms(2021, 3, 4, 0, 0, 0).unwrap()));
}

#[test]
fn test_partial_timestamps() {
    let new_year = Cell::Timestamp(Utc.with_ymd_and_hms(2012, 1, 1, 0, 0, 0).unwrap());
    for text in ["2012", "2012/01", "2012-01", "2012/1"] {
        assert_eq!(coerce(&Value::from(text), ColumnFormat::Timestamp, None), new_year, "{}", text);
    }

    let march = coerce(&Value::from("2012-03"), ColumnFormat::Timestamp, None);
    assert_eq!(march, Cell::Timestamp(Utc.with_ymd_and_hms(2012, 3, 1, 0, 0, 0).unwrap()));
    assert_eq!(coerce(&Value::from("2012-13"), ColumnFormat::Timestamp, None), Cell::Null);
}

#[test]
fn test_digit_strings_are_epoch_millis() {
    let short = coerce(&Value::from("1700000000"), ColumnFormat::Timestamp, None);
    assert_eq!(short, Cell::Timestamp(Utc.timestamp_millis_opt(1_700_000_000).unwrap()));

    let long = coerce(&Value::from("1700000000000"), ColumnFormat::Timestamp, None);
    assert_eq!(long, Cell::Timestamp(Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()));

    let seconds = coerce(&Value::from("1700000000"), ColumnFormat::TimestampEpochSeconds, None);
    assert_eq!(seconds, long);
}

#[test]
fn test_number_coercion_idempotent() {
    for value in [Value::from("123,456.78"), Value::from(" 42 "), Value::Number(-0.5), Value::Bool(true)] {
        let once = coerce(&value, ColumnFormat::Number, None);
        let n = once.as_f64().unwrap();
        assert_eq!(coerce(&Value::Number(n), ColumnFormat::Number, None), once);
    }
}

#[test]
fn test_timeseries_groups_by_dimensions() {
    let rows = rows(
        r#"[
            {"ts": "2021-01-02T00:00:00Z", "host": "a", "cpu": 2},
            {"ts": "2021-01-01T00:00:00Z", "host": "a", "cpu": 1},
            {"ts": "2021-01-01T00:00:00Z", "host": "b", "cpu": 5},
            {"ts": null, "host": "b", "cpu": 9},
            {"ts": "2021-01-02T00:00:00Z", "host": "a", "cpu": 3}
        ]"#,
    );
    let columns = vec![
        ColumnSpec::new("ts", "time", ColumnFormat::Timestamp),
        ColumnSpec::new("host", "", ColumnFormat::String),
        ColumnSpec::new("cpu", "", ColumnFormat::Number),
    ];
    let mut warnings = Warnings::new();
    let set = to_timeseries(&rows, &columns, &mut warnings).unwrap();

    assert_eq!(set.time_field, "time");
    assert_eq!(set.dimensions, vec!["host".to_string()]);
    assert_eq!(set.len(), 2);

    let a = &set.series[0];
    assert_eq!(a.key, vec![Cell::String("a".to_string())]);
    assert_eq!(a.field, "cpu");
    let values: Vec<Option<f64>> = a.points.iter().map(|p| p.value).collect();
    // Sorted by time; duplicate timestamps keep input order
    assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);

    assert_eq!(set.series[1].points.len(), 1);
    assert_eq!(warnings.len(), 1);
}

#[test]
fn test_timeseries_requires_time_and_value_columns() {
    let rows = rows(r#"[{"ts": 0, "v": 1}]"#);
    let mut warnings = Warnings::new();

    let no_time = vec![ColumnSpec::new("v", "", ColumnFormat::Number)];
    assert!(matches!(
        to_timeseries(&rows, &no_time, &mut warnings),
        Err(FrameError::InvalidTimeSeries(_))
    ));

    let no_value = vec![ColumnSpec::new("ts", "", ColumnFormat::TimestampEpochMillis)];
    assert!(matches!(
        to_timeseries(&rows, &no_value, &mut warnings),
        Err(FrameError::InvalidTimeSeries(_))
    ));
}

#[test]
fn test_column_spec_notation() {
    let spec = ColumnSpec::parse("data.created:created:timestamp").unwrap();
    assert_eq!(spec, ColumnSpec::new("data.created", "created", ColumnFormat::Timestamp));
    assert_eq!(ColumnSpec::parse("name").unwrap().name(), "name");
    assert!(ColumnSpec::parse("a:b:colour").is_none());
}
