// Time series assembly
// Author: Gabriel Demetrios Lafis

use indexmap::IndexMap;

use crate::data::{Cell, ColumnType, Value, Warnings};

use super::{to_table, ColumnSpec, Frame, FrameError, Series, SeriesPoint, SeriesSet};

/// Build a series set from rows using the declared columns
pub fn to_timeseries(
    rows: &[Value],
    columns: &[ColumnSpec],
    warnings: &mut Warnings,
) -> Result<SeriesSet, FrameError> {
    let frame = to_table(rows, columns, warnings);
    series_from_frame(&frame, warnings)
}

/// Pivot a frame into series.
///
/// The frame needs exactly one timestamp column and at least one number
/// column; string columns become the dimensions keying each series.
pub fn series_from_frame(frame: &Frame, warnings: &mut Warnings) -> Result<SeriesSet, FrameError> {
    let indices_of = |column_type: ColumnType| -> Vec<usize> {
        frame
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.column_type == column_type)
            .map(|(i, _)| i)
            .collect()
    };

    let time_indices = indices_of(ColumnType::Timestamp);
    let value_indices = indices_of(ColumnType::Number);
    let dimension_indices = indices_of(ColumnType::String);

    let time_index = match time_indices.as_slice() {
        [index] => *index,
        [] => {
            return Err(FrameError::InvalidTimeSeries(
                "no timestamp column declared".to_string(),
            ))
        }
        _ => {
            return Err(FrameError::InvalidTimeSeries(format!(
                "expected one timestamp column, found {}",
                time_indices.len()
            )))
        }
    };

    if value_indices.is_empty() {
        return Err(FrameError::InvalidTimeSeries(
            "no number column declared".to_string(),
        ));
    }

    // Groups keep first-seen order
    let mut groups: IndexMap<String, (Vec<Cell>, Vec<usize>)> = IndexMap::new();
    let mut dropped = 0;

    for (row_index, row) in frame.rows.iter().enumerate() {
        if row.get(time_index).and_then(Cell::as_timestamp).is_none() {
            dropped += 1;
            continue;
        }

        let key: Vec<Cell> = dimension_indices
            .iter()
            .map(|&i| row.get(i).cloned().unwrap_or(Cell::Null))
            .collect();
        let group_key = serde_json::to_string(&key).unwrap_or_default();

        groups
            .entry(group_key)
            .or_insert_with(|| (key, Vec::new()))
            .1
            .push(row_index);
    }

    if dropped > 0 {
        warnings.push(format!("dropped {} row(s) without a timestamp", dropped));
    }

    let mut series = Vec::new();

    for (_, (key, mut row_indices)) in groups {
        // Stable: duplicate timestamps keep their input order
        row_indices.sort_by_key(|&i| frame.rows[i].get(time_index).and_then(Cell::as_timestamp));

        for &value_index in &value_indices {
            let points = row_indices
                .iter()
                .filter_map(|&i| {
                    let row = &frame.rows[i];
                    Some(SeriesPoint {
                        timestamp: row.get(time_index)?.as_timestamp()?,
                        value: row.get(value_index).and_then(Cell::as_f64),
                    })
                })
                .collect();

            series.push(Series {
                key: key.clone(),
                field: frame.columns[value_index].name.clone(),
                points,
            });
        }
    }

    log::debug!("pivoted {} rows into {} series", frame.len(), series.len());

    Ok(SeriesSet {
        name: frame.name.clone(),
        time_field: frame.columns[time_index].name.clone(),
        dimensions: dimension_indices
            .iter()
            .map(|&i| frame.columns[i].name.clone())
            .collect(),
        series,
    })
}
