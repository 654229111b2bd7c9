//! Hashable composite keys built from cell values

use super::value::Value;
use chrono::NaiveDateTime;

/// Normalised, hashable form of a tuple of values.
///
/// Used to index rows by their key columns. Integral floats compare equal to
/// ints (`1 == 1.0`), `-0.0` equals `0.0` and NaN equals null.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(Vec<KeyPart>);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Timestamp(NaiveDateTime),
    List(Vec<KeyPart>),
}

impl KeyPart {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::Int(i) => KeyPart::Int(*i),
            Value::Float(f) => {
                if f.is_nan() {
                    KeyPart::Null
                } else if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    KeyPart::Int(*f as i64)
                } else {
                    KeyPart::Float(f.to_bits())
                }
            }
            Value::String(s) => KeyPart::String(s.clone()),
            Value::Timestamp(ts) => KeyPart::Timestamp(*ts),
            Value::List(items) => KeyPart::List(items.iter().map(KeyPart::from_value).collect()),
        }
    }
}

impl RowKey {
    pub fn new<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        RowKey(values.into_iter().map(KeyPart::from_value).collect())
    }

    /// Key of `row` restricted to the given column positions
    pub fn from_row(row: &[Value], positions: &[usize]) -> Self {
        RowKey(positions.iter().map(|&i| KeyPart::from_value(&row[i])).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
