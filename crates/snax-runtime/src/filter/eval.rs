//! Row-mask evaluation of filter expressions

use super::parser::{CompareOp, Predicate};
use crate::error::{Result, RuntimeError};
use snax_core::cast::parse_timestamp;
use snax_core::types::value::format_timestamp;
use snax_core::{Table, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Evaluate `predicate` against every row of `table`
pub fn evaluate(predicate: &Predicate, table: &Table, source_name: &str) -> Result<Vec<bool>> {
    let mut positions = HashMap::new();
    for column in predicate.columns() {
        let idx = table
            .column_index(column)
            .ok_or_else(|| RuntimeError::ColumnNotFound {
                column: column.to_string(),
                source_name: source_name.to_string(),
            })?;
        positions.insert(column.to_string(), idx);
    }
    if let Some(lookup) = KeyLookup::new(predicate, &positions) {
        return Ok(table.rows().iter().map(|row| lookup.matches(row)).collect());
    }
    Ok(table
        .rows()
        .iter()
        .map(|row| matches_row(predicate, row, &positions))
        .collect())
}

fn matches_row(predicate: &Predicate, row: &[Value], positions: &HashMap<String, usize>) -> bool {
    match predicate {
        Predicate::Literal(b) => *b,
        Predicate::Compare { column, op, value } => {
            let cell = &row[positions[column]];
            compare(cell, *op, value)
        }
        Predicate::In {
            column,
            values,
            negated,
        } => {
            let cell = &row[positions[column]];
            let found = values.iter().any(|v| compare(cell, CompareOp::Eq, v));
            found != *negated
        }
        Predicate::Not(inner) => !matches_row(inner, row, positions),
        Predicate::And(terms) => terms.iter().all(|t| matches_row(t, row, positions)),
        Predicate::Or(terms) => terms.iter().any(|t| matches_row(t, row, positions)),
    }
}

/// Coarse hash class of a value. Two values `compare` equal only if they
/// share a bucket; candidates found by bucket are still checked with
/// `compare`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Bucket {
    Null,
    Number(u64),
    Text(String),
}

fn cell_bucket(value: &Value) -> Option<Bucket> {
    // -0.0 == 0.0
    let number = |f: f64| {
        let f = if f == 0.0 { 0.0 } else { f };
        Bucket::Number(f.to_bits())
    };
    match value {
        v if v.is_null() => Some(Bucket::Null),
        Value::Int(i) => Some(number(*i as f64)),
        Value::Float(f) => Some(number(*f)),
        Value::Bool(b) => Some(number(if *b { 1.0 } else { 0.0 })),
        Value::String(s) => Some(Bucket::Text(s.clone())),
        Value::Timestamp(ts) => Some(Bucket::Text(format_timestamp(ts))),
        Value::List(_) | Value::Null => None,
    }
}

/// Buckets a literal may meet a cell in. A string that reads as a timestamp
/// also lands in the bucket of the timestamp cells it equals.
fn literal_buckets(value: &Value) -> Vec<Bucket> {
    match value {
        Value::String(s) => {
            let mut buckets = vec![Bucket::Text(s.clone())];
            if let Some(ts) = parse_timestamp(s, None).map(|ts| format_timestamp(&ts)) {
                if &ts != s {
                    buckets.push(Bucket::Text(ts));
                }
            }
            buckets
        }
        other => cell_bucket(other).into_iter().collect(),
    }
}

/// Hash index over a disjunction of equality conjunctions on one column set,
/// the shape key lookups render to. Matching a row costs one hash lookup
/// instead of a scan over every key tuple.
struct KeyLookup<'a> {
    positions: Vec<usize>,
    tuples: Vec<Vec<&'a Value>>,
    index: HashMap<Vec<Bucket>, Vec<usize>>,
}

impl<'a> KeyLookup<'a> {
    fn new(predicate: &'a Predicate, positions: &HashMap<String, usize>) -> Option<Self> {
        let Predicate::Or(terms) = predicate else {
            return None;
        };
        let mut columns: Option<Vec<&str>> = None;
        let mut tuples = Vec::with_capacity(terms.len());
        for term in terms {
            let (term_columns, values) = equalities(term)?;
            match &columns {
                Some(expected) if *expected != term_columns => return None,
                Some(_) => {}
                None => columns = Some(term_columns),
            }
            tuples.push(values);
        }
        let columns = columns?;

        let mut index: HashMap<Vec<Bucket>, Vec<usize>> = HashMap::with_capacity(tuples.len());
        for (i, values) in tuples.iter().enumerate() {
            let mut keys: Vec<Vec<Bucket>> = vec![Vec::with_capacity(values.len())];
            for value in values {
                let buckets = literal_buckets(value);
                keys = keys
                    .into_iter()
                    .flat_map(|prefix| {
                        buckets.iter().map(move |b| {
                            let mut key = prefix.clone();
                            key.push(b.clone());
                            key
                        })
                    })
                    .collect();
            }
            for key in keys {
                index.entry(key).or_default().push(i);
            }
        }
        Some(Self {
            positions: columns.iter().map(|c| positions[*c]).collect(),
            tuples,
            index,
        })
    }

    fn matches(&self, row: &[Value]) -> bool {
        let Some(key) = self
            .positions
            .iter()
            .map(|&i| cell_bucket(&row[i]))
            .collect::<Option<Vec<Bucket>>>()
        else {
            return false;
        };
        self.index.get(&key).map_or(false, |candidates| {
            candidates.iter().any(|&i| {
                self.positions
                    .iter()
                    .zip(&self.tuples[i])
                    .all(|(&p, literal)| compare(&row[p], CompareOp::Eq, literal))
            })
        })
    }
}

/// Columns and literals of `a == x` or `a == x and b == y ...` over distinct
/// columns
fn equalities(term: &Predicate) -> Option<(Vec<&str>, Vec<&Value>)> {
    let parts = match term {
        Predicate::And(parts) => parts.as_slice(),
        single => std::slice::from_ref(single),
    };
    let mut columns = Vec::with_capacity(parts.len());
    let mut values = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            Predicate::Compare {
                column,
                op: CompareOp::Eq,
                value,
            } if !columns.contains(&column.as_str()) => {
                columns.push(column.as_str());
                values.push(value);
            }
            _ => return None,
        }
    }
    Some((columns, values))
}

/// Compare a cell against a literal.
///
/// `== null` matches missing cells and `!= null` populated ones; any other
/// comparison involving a missing value is false except `!=`.
pub fn compare(cell: &Value, op: CompareOp, literal: &Value) -> bool {
    match (cell.is_null(), literal.is_null()) {
        (true, true) => return matches!(op, CompareOp::Eq | CompareOp::Le | CompareOp::Ge),
        (true, false) | (false, true) => return op == CompareOp::Ne,
        (false, false) => {}
    }

    match op {
        CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith => {
            let (Some(text), Some(pattern)) = (cell.as_str(), literal.as_str()) else {
                return false;
            };
            match op {
                CompareOp::Contains => text.contains(pattern),
                CompareOp::StartsWith => text.starts_with(pattern),
                _ => text.ends_with(pattern),
            }
        }
        _ => match order(cell, literal) {
            Some(ordering) => match op {
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Ne => ordering != Ordering::Equal,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
                _ => false,
            },
            None => op == CompareOp::Ne,
        },
    }
}

fn order(cell: &Value, literal: &Value) -> Option<Ordering> {
    match (cell, literal) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::String(b)) => parse_timestamp(b, None).map(|b| a.cmp(&b)),
        (Value::List(a), Value::List(b)) => {
            if a.len() != b.len() {
                return Some(a.len().cmp(&b.len()));
            }
            for (x, y) in a.iter().zip(b) {
                match order(x, y)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(Ordering::Equal)
        }
        _ => {
            let a = numeric(cell)?;
            let b = numeric(literal)?;
            a.partial_cmp(&b)
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}
