//! Semantic value types
//!
//! `ValueType` tags a feature with the type its values should be cast to. It is
//! a casting hint only; storage never enforces it.

use super::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic type of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueType {
    #[default]
    Unknown,
    String,
    Int,
    Float,
    Bool,
    Timestamp,
    StringList,
    IntList,
    FloatList,
    BoolList,
    TimestampList,
    Null,
}

impl ValueType {
    pub const ALL: [ValueType; 12] = [
        ValueType::Unknown,
        ValueType::String,
        ValueType::Int,
        ValueType::Float,
        ValueType::Bool,
        ValueType::Timestamp,
        ValueType::StringList,
        ValueType::IntList,
        ValueType::FloatList,
        ValueType::BoolList,
        ValueType::TimestampList,
        ValueType::Null,
    ];

    /// Upper-case name, e.g. `INT_LIST`
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Unknown => "UNKNOWN",
            ValueType::String => "STRING",
            ValueType::Int => "INT",
            ValueType::Float => "FLOAT",
            ValueType::Bool => "BOOL",
            ValueType::Timestamp => "TIMESTAMP",
            ValueType::StringList => "STRING_LIST",
            ValueType::IntList => "INT_LIST",
            ValueType::FloatList => "FLOAT_LIST",
            ValueType::BoolList => "BOOL_LIST",
            ValueType::TimestampList => "TIMESTAMP_LIST",
            ValueType::Null => "NULL",
        }
    }

    pub fn is_list(&self) -> bool {
        self.element_type().is_some()
    }

    /// Element type of a list type, `None` for scalar types
    pub fn element_type(&self) -> Option<ValueType> {
        match self {
            ValueType::StringList => Some(ValueType::String),
            ValueType::IntList => Some(ValueType::Int),
            ValueType::FloatList => Some(ValueType::Float),
            ValueType::BoolList => Some(ValueType::Bool),
            ValueType::TimestampList => Some(ValueType::Timestamp),
            _ => None,
        }
    }

    /// List type with the given element type, `None` if there is none
    pub fn list_of(element: ValueType) -> Option<ValueType> {
        match element {
            ValueType::String => Some(ValueType::StringList),
            ValueType::Int => Some(ValueType::IntList),
            ValueType::Float => Some(ValueType::FloatList),
            ValueType::Bool => Some(ValueType::BoolList),
            ValueType::Timestamp => Some(ValueType::TimestampList),
            _ => None,
        }
    }

    /// Type of a single value. Missing values yield `Null`.
    pub fn of(value: &Value) -> ValueType {
        match value {
            v if v.is_null() => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::List(items) => {
                let element = ValueType::infer(items);
                ValueType::list_of(element).unwrap_or(ValueType::StringList)
            }
            Value::Null => ValueType::Null,
        }
    }

    /// Infer the type of a column from its values.
    ///
    /// Missing values are skipped; ints mixed with floats widen to `Float`,
    /// any other mix falls back to `String`. A column with no populated values
    /// is `Unknown`.
    pub fn infer<'a, I>(values: I) -> ValueType
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut inferred: Option<ValueType> = None;
        for value in values {
            let current = ValueType::of(value);
            if current == ValueType::Null {
                continue;
            }
            inferred = Some(match inferred {
                None => current,
                Some(previous) => merge(previous, current),
            });
        }
        inferred.unwrap_or(ValueType::Unknown)
    }
}

fn merge(a: ValueType, b: ValueType) -> ValueType {
    match (a, b) {
        (a, b) if a == b => a,
        (ValueType::Int, ValueType::Float) | (ValueType::Float, ValueType::Int) => ValueType::Float,
        (ValueType::IntList, ValueType::FloatList) | (ValueType::FloatList, ValueType::IntList) => {
            ValueType::FloatList
        }
        (a, b) if a.is_list() && b.is_list() => ValueType::StringList,
        _ => ValueType::String,
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = std::convert::Infallible;

    /// Case-insensitive; unknown names map to `Unknown`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Ok(ValueType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(wanted))
            .unwrap_or(ValueType::Unknown))
    }
}

impl From<String> for ValueType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl From<ValueType> for String {
    fn from(t: ValueType) -> Self {
        t.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("int".parse::<ValueType>().unwrap(), ValueType::Int);
        assert_eq!("Timestamp_List".parse::<ValueType>().unwrap(), ValueType::TimestampList);
        assert_eq!("no_such_type".parse::<ValueType>().unwrap(), ValueType::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueType::FloatList.to_string(), "FLOAT_LIST");
        assert_eq!(ValueType::Null.to_string(), "NULL");
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&ValueType::BoolList).unwrap();
        assert_eq!(json, "\"BOOL_LIST\"");
        let parsed: ValueType = serde_json::from_str("\"string\"").unwrap();
        assert_eq!(parsed, ValueType::String);
    }

    #[test]
    fn test_infer() {
        assert_eq!(ValueType::infer(&[Value::Int(1), Value::Null]), ValueType::Int);
        assert_eq!(ValueType::infer(&[Value::Int(1), Value::Float(2.5)]), ValueType::Float);
        assert_eq!(ValueType::infer(&[Value::Int(1), Value::from("a")]), ValueType::String);
        assert_eq!(ValueType::infer(&[Value::Null, Value::Float(f64::NAN)]), ValueType::Unknown);
        assert_eq!(
            ValueType::infer(&[Value::from(vec![1, 2])]),
            ValueType::IntList
        );
    }

    #[test]
    fn test_list_element_types() {
        for t in ValueType::ALL {
            if let Some(element) = t.element_type() {
                assert_eq!(ValueType::list_of(element), Some(t));
            }
        }
        assert!(!ValueType::Int.is_list());
    }
}
