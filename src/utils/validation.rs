// Validation utilities
// Author: Gabriel Demetrios Lafis

use crate::data::ColumnType;
use crate::frame::ColumnSpec;

/// Validate that a query language has source text
pub fn validate_query_text(language: &str, source: &str) -> Result<(), String> {
    validate_not_empty(source, language).map_err(|_| format!("the {} parser needs query text", language))
}

/// Validate declared columns.
///
/// For time series output an explicit column list needs exactly one
/// timestamp column and at least one number column.
pub fn validate_columns(columns: &[ColumnSpec], timeseries: bool) -> Result<(), String> {
    for (i, column) in columns.iter().enumerate() {
        if column.selector.trim().is_empty() && column.alias.trim().is_empty() {
            return Err(format!("column {} has neither a selector nor an alias", i));
        }
    }

    if !timeseries || columns.is_empty() {
        return Ok(());
    }

    let count = |column_type: ColumnType| {
        columns
            .iter()
            .filter(|c| c.format.column_type() == column_type)
            .count()
    };

    match (count(ColumnType::Timestamp), count(ColumnType::Number)) {
        (1, n) if n > 0 => Ok(()),
        (1, _) => Err("a time series needs at least one number column".to_string()),
        (t, _) => Err(format!("a time series needs exactly one timestamp column, found {}", t)),
    }
}

/// Validate that a string is not blank
pub fn validate_not_empty(value: &str, name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("'{}' cannot be empty", name))
    } else {
        Ok(())
    }
}

/// Validate that a value is in range
pub fn validate_range<T: PartialOrd + std::fmt::Display>(
    value: T,
    min: T,
    max: T,
    name: &str,
) -> Result<(), String> {
    if value < min || value > max {
        Err(format!("'{}' must be between {} and {}", name, min, max))
    } else {
        Ok(())
    }
}
