//! Tolerant casting of values to semantic types
//!
//! Casting never fails: values that cannot be represented in the target type
//! become `Value::Null`. A feature store degrades a bad cell to missing rather
//! than abort a whole selection.

mod timestamp;

pub use timestamp::{guess_timestamp_format, parse_timestamp, parse_with_format};

use crate::types::{Feature, Table, Value, ValueType};
use chrono::DateTime;

/// Cast every value of `series` to `value_type`.
///
/// Timestamp formats are guessed once from the first non-missing string in
/// the series (or in the list elements for `TIMESTAMP_LIST`).
pub fn cast(series: &[Value], value_type: ValueType) -> Vec<Value> {
    match value_type {
        ValueType::Unknown => series.to_vec(),
        ValueType::Null => vec![Value::Null; series.len()],
        ValueType::Timestamp => {
            let format = guess_timestamp_format(series);
            series
                .iter()
                .map(|v| to_timestamp(v, format.as_deref()))
                .collect()
        }
        t if t.is_list() => {
            let element_type = t.element_type().unwrap_or(ValueType::String);
            let parsed: Vec<Option<Vec<Value>>> = series.iter().map(parse_list).collect();
            let format = if element_type == ValueType::Timestamp {
                let elements: Vec<Value> = parsed.iter().flatten().flatten().cloned().collect();
                guess_timestamp_format(&elements)
            } else {
                None
            };
            parsed
                .into_iter()
                .map(|items| match items {
                    Some(items) => Value::List(
                        items
                            .iter()
                            .map(|v| cast_scalar(v, element_type, format.as_deref()))
                            .collect(),
                    ),
                    None => Value::Null,
                })
                .collect()
        }
        t => series.iter().map(|v| cast_scalar(v, t, None)).collect(),
    }
}

/// Cast a single value. Timestamps are parsed with the usual ISO formats.
pub fn cast_value(value: &Value, value_type: ValueType) -> Value {
    cast(std::slice::from_ref(value), value_type)
        .pop()
        .unwrap_or(Value::Null)
}

/// Cast the columns of `table` named after `features` to the feature types.
///
/// Columns without a matching feature are left untouched, as are features
/// whose column is absent.
pub fn cast_to_feature_types(table: &Table, features: &[Feature]) -> Table {
    let mut cast_table = table.clone();
    for feature in features {
        let Ok(values) = table.column(&feature.name) else {
            continue;
        };
        let cast_values = cast(&values, feature.dtype);
        if let Err(e) = cast_table.set_column(&feature.name, cast_values) {
            tracing::warn!("Failed to cast column '{}': {}", feature.name, e);
        }
    }
    cast_table
}

fn cast_scalar(value: &Value, value_type: ValueType, format: Option<&str>) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match value_type {
        ValueType::String => to_string(value),
        ValueType::Int => to_int(value),
        ValueType::Float => to_float(value),
        ValueType::Bool => to_bool(value),
        ValueType::Timestamp => to_timestamp(value, format),
        ValueType::Unknown => value.clone(),
        _ => Value::Null,
    }
}

fn to_string(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.clone()),
        Value::List(_) => Value::String(value.to_json().to_string()),
        other => Value::String(other.to_string()),
    }
}

fn to_int(value: &Value) -> Value {
    match value {
        Value::Int(i) => Value::Int(*i),
        Value::Bool(b) => Value::Int(*b as i64),
        Value::Float(f) => integral(*f),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => s.parse::<f64>().map(integral).unwrap_or(Value::Null),
            }
        }
        _ => Value::Null,
    }
}

fn integral(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Value::Int(f as i64)
    } else {
        Value::Null
    }
}

fn to_float(value: &Value) -> Value {
    match value {
        Value::Float(f) => Value::Float(*f),
        Value::Int(i) => Value::Float(*i as f64),
        Value::Bool(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| !f.is_nan())
            .map(Value::Float)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn to_bool(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(*b),
        Value::Int(i) => Value::Bool(*i != 0),
        Value::Float(f) => Value::Bool(*f != 0.0),
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            match s.as_str() {
                "true" | "t" | "yes" | "y" | "1" => Value::Bool(true),
                "false" | "f" | "no" | "n" | "0" => Value::Bool(false),
                _ => s
                    .parse::<f64>()
                    .ok()
                    .filter(|f| !f.is_nan())
                    .map(|f| Value::Bool(f != 0.0))
                    .unwrap_or(Value::Null),
            }
        }
        _ => Value::Null,
    }
}

fn to_timestamp(value: &Value, format: Option<&str>) -> Value {
    match value {
        Value::Timestamp(ts) => Value::Timestamp(*ts),
        Value::String(s) => parse_timestamp(s, format)
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        // epoch seconds
        Value::Int(secs) => DateTime::from_timestamp(*secs, 0)
            .map(|dt| Value::Timestamp(dt.naive_utc()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Elements of a list value or of the JSON array text it is stored as
fn parse_list(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::List(items) => Some(items.clone()),
        Value::String(s) => match serde_json::from_str::<serde_json::Value>(s.trim()) {
            Ok(serde_json::Value::Array(items)) => {
                Some(items.into_iter().map(Value::from_json).collect())
            }
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn strings(values: &[Option<&str>]) -> Vec<Value> {
        values.iter().map(|v| Value::from(*v)).collect()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> Value {
        Value::Timestamp(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, mi, s)
                .unwrap(),
        )
    }

    #[test]
    fn test_cast_timestamp() {
        let cast_values = cast(
            &strings(&[Some("2020-01-01"), Some("2020-01-02"), None]),
            ValueType::Timestamp,
        );
        assert_eq!(
            cast_values,
            vec![ts(2020, 1, 1, 0, 0, 0), ts(2020, 1, 2, 0, 0, 0), Value::Null]
        );

        let cast_values = cast(
            &strings(&[Some("2020-01-01T01:01:17"), Some("2020-01-02T01:01:18"), None]),
            ValueType::Timestamp,
        );
        assert_eq!(cast_values[1], ts(2020, 1, 2, 1, 1, 18));
    }

    #[test]
    fn test_cast_bool() {
        let cast_values = cast(
            &strings(&[Some("True"), Some("F"), Some("0.0"), None]),
            ValueType::Bool,
        );
        assert_eq!(
            cast_values,
            vec![Value::Bool(true), Value::Bool(false), Value::Bool(false), Value::Null]
        );
    }

    #[test]
    fn test_cast_numbers() {
        assert_eq!(
            cast(&strings(&[Some("1.0"), Some("x"), None]), ValueType::Float),
            vec![Value::Float(1.0), Value::Null, Value::Null]
        );
        assert_eq!(
            cast(&strings(&[Some("1"), Some("2.0"), Some("2.5")]), ValueType::Int),
            vec![Value::Int(1), Value::Int(2), Value::Null]
        );
    }

    #[test]
    fn test_cast_string() {
        assert_eq!(
            cast(&[Value::Int(1), Value::Null, Value::from("c")], ValueType::String),
            vec![Value::from("1"), Value::Null, Value::from("c")]
        );
    }

    #[test]
    fn test_cast_timestamp_list() {
        let series = strings(&[
            Some(r#"["2020-01-03H15:24:35", "2022-01-04H15:26:35", null]"#),
            Some(r#"["2023-01-03H15:24:35"]"#),
        ]);
        let cast_values = cast(&series, ValueType::TimestampList);
        assert_eq!(
            cast_values[0],
            Value::List(vec![ts(2020, 1, 3, 15, 24, 35), ts(2022, 1, 4, 15, 26, 35), Value::Null])
        );
        assert_eq!(cast_values[1], Value::List(vec![ts(2023, 1, 3, 15, 24, 35)]));
    }

    #[test]
    fn test_cast_scalar_lists() {
        let bools = cast(&strings(&[Some("[false, null, false]")]), ValueType::BoolList);
        assert_eq!(
            bools[0],
            Value::List(vec![Value::Bool(false), Value::Null, Value::Bool(false)])
        );

        let floats = cast(&strings(&[Some("[2.0, null, 4.0]")]), ValueType::FloatList);
        assert_eq!(
            floats[0],
            Value::List(vec![Value::Float(2.0), Value::Null, Value::Float(4.0)])
        );

        let ints = cast(&strings(&[Some("[3, null, 5]"), Some("garbage")]), ValueType::IntList);
        assert_eq!(ints[0], Value::List(vec![Value::Int(3), Value::Null, Value::Int(5)]));
        assert_eq!(ints[1], Value::Null);

        let names = cast(&strings(&[Some(r#"["b", "c", null]"#)]), ValueType::StringList);
        assert_eq!(
            names[0],
            Value::List(vec![Value::from("b"), Value::from("c"), Value::Null])
        );
    }

    #[test]
    fn test_cast_to_feature_types() {
        let table = Table::from_columns(vec![
            ("timestamp", strings(&[Some("2020-01-01"), Some("2020-01-02")])),
            ("bool", strings(&[Some("true"), Some("false")])),
            ("float", strings(&[Some("1.0"), Some("2.0")])),
            ("int", strings(&[Some("1"), Some("2")])),
            ("string", strings(&[Some("a"), Some("b")])),
        ])
        .unwrap();
        let features = vec![
            Feature::new("timestamp", ValueType::Timestamp),
            Feature::new("bool", ValueType::Bool),
            Feature::new("float", ValueType::Float),
            Feature::new("int", ValueType::Int),
            Feature::new("string", ValueType::String),
            Feature::new("absent", ValueType::Int),
        ];
        let cast_table = cast_to_feature_types(&table, &features);
        assert_eq!(
            cast_table.row(0).unwrap(),
            &[
                ts(2020, 1, 1, 0, 0, 0),
                Value::Bool(true),
                Value::Float(1.0),
                Value::Int(1),
                Value::from("a"),
            ]
        );
        assert!(!cast_table.has_column("absent"));
    }
}
