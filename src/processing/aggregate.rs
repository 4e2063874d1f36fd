// Aggregate operations for the summarize verb
// Author: Gabriel Demetrios Lafis

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::data::{coerce_number, resolve, Map, Value};

use super::Expr;

/// Aggregation functions accepted by `summarize`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    DistinctCount,
    First,
    Last,
}

impl AggregateFunction {
    /// Look up an aggregation by name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "mean" | "avg" => Some(AggregateFunction::Mean),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "dcount" => Some(AggregateFunction::DistinctCount),
            "first" => Some(AggregateFunction::First),
            "last" => Some(AggregateFunction::Last),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Mean => "mean",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::DistinctCount => "dcount",
            AggregateFunction::First => "first",
            AggregateFunction::Last => "last",
        }
    }

    /// Whether the function may be called without an argument
    pub fn allows_no_argument(&self) -> bool {
        matches!(self, AggregateFunction::Count)
    }

    /// Initialize the aggregation state
    fn init(&self) -> Accumulator {
        match self {
            AggregateFunction::Count => Accumulator::Count(0),
            AggregateFunction::Sum => Accumulator::Sum(0.0),
            AggregateFunction::Mean => Accumulator::Mean { sum: 0.0, count: 0 },
            AggregateFunction::Min => Accumulator::Min(None),
            AggregateFunction::Max => Accumulator::Max(None),
            AggregateFunction::DistinctCount => Accumulator::Distinct(HashSet::new()),
            AggregateFunction::First => Accumulator::First(None),
            AggregateFunction::Last => Accumulator::Last(None),
        }
    }
}

/// One aggregate of a summarize clause
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub name: String,
    pub function: AggregateFunction,
    /// `None` only for `count()`
    pub argument: Option<Expr>,
}

impl Aggregate {
    pub fn new(name: &str, function: AggregateFunction, argument: Option<Expr>) -> Self {
        Aggregate {
            name: name.to_string(),
            function,
            argument,
        }
    }
}

/// Running state of one aggregate within one group
#[derive(Debug, Clone)]
enum Accumulator {
    Count(u64),
    Sum(f64),
    Mean { sum: f64, count: u64 },
    Min(Option<f64>),
    Max(Option<f64>),
    Distinct(HashSet<String>),
    First(Option<Value>),
    Last(Option<Value>),
}

impl Accumulator {
    /// Update the state with the argument value of one row; `None` means no argument
    fn update(&mut self, value: Option<Value>) {
        let value = match value {
            None => {
                if let Accumulator::Count(n) = self {
                    *n += 1;
                }
                return;
            }
            Some(Value::Null) => return,
            Some(value) => value,
        };

        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::Sum(total) => {
                if let Some(x) = coerce_number(&value) {
                    *total += x;
                }
            }
            Accumulator::Mean { sum, count } => {
                if let Some(x) = coerce_number(&value) {
                    *sum += x;
                    *count += 1;
                }
            }
            Accumulator::Min(current) => {
                if let Some(x) = coerce_number(&value) {
                    *current = Some(current.map_or(x, |c| c.min(x)));
                }
            }
            Accumulator::Max(current) => {
                if let Some(x) = coerce_number(&value) {
                    *current = Some(current.map_or(x, |c| c.max(x)));
                }
            }
            Accumulator::Distinct(seen) => {
                seen.insert(value.group_key());
            }
            Accumulator::First(first) => {
                if first.is_none() {
                    *first = Some(value);
                }
            }
            Accumulator::Last(last) => *last = Some(value),
        }
    }

    /// Finalize the aggregation and return the result
    fn finalize(self) -> Value {
        match self {
            Accumulator::Count(n) => Value::from(n as i64),
            Accumulator::Sum(total) => Value::Number(total),
            Accumulator::Mean { count: 0, .. } => Value::Null,
            Accumulator::Mean { sum, count } => Value::Number(sum / count as f64),
            Accumulator::Min(x) | Accumulator::Max(x) => x.map_or(Value::Null, Value::Number),
            Accumulator::Distinct(seen) => Value::from(seen.len() as i64),
            Accumulator::First(value) | Accumulator::Last(value) => value.unwrap_or(Value::Null),
        }
    }
}

/// Group rows by the `by` fields and compute the aggregates per group.
///
/// Groups keep first-seen order; each output record holds the `by` fields
/// followed by the aggregates.
pub fn summarize(rows: &[Value], aggregates: &[Aggregate], by: &[String]) -> Vec<Value> {
    let mut groups: IndexMap<String, (Vec<Value>, Vec<Accumulator>)> = IndexMap::new();

    for row in rows {
        let key_values: Vec<Value> = by.iter().map(|field| resolve(row, field)).collect();
        let key = Value::Array(key_values.clone()).group_key();

        let (_, accumulators) = groups.entry(key).or_insert_with(|| {
            let accumulators = aggregates.iter().map(|a| a.function.init()).collect();
            (key_values, accumulators)
        });

        for (aggregate, accumulator) in aggregates.iter().zip(accumulators.iter_mut()) {
            accumulator.update(aggregate.argument.as_ref().map(|expr| expr.eval(row)));
        }
    }

    // Without grouping fields an empty input still yields one record
    if groups.is_empty() && by.is_empty() {
        let accumulators = aggregates.iter().map(|a| a.function.init()).collect();
        groups.insert(String::new(), (Vec::new(), accumulators));
    }

    log::debug!("summarized {} rows into {} groups", rows.len(), groups.len());

    groups
        .into_iter()
        .map(|(_, (key_values, accumulators))| {
            let mut record = Map::new();
            for (field, value) in by.iter().zip(key_values) {
                record.insert(field.clone(), value);
            }
            for (aggregate, accumulator) in aggregates.iter().zip(accumulators) {
                record.insert(aggregate.name.clone(), accumulator.finalize());
            }
            Value::Object(record)
        })
        .collect()
}
