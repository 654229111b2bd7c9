//! In-memory filter language
//!
//! Predicates for in-memory and file-backed sources are written in a small
//! expression language:
//!
//! - comparisons: `age >= 18`, `name == 'John'`, `score != null`
//! - membership: `id in (1, 2, 3)`, `country not in ['DE', 'AT']`
//! - string tests: `venue contains 'Arena'`, `code starts_with 'A'`
//! - boolean logic: `and` / `or` / `not` with parentheses
//! - literals: quoted strings, numbers, `true` / `false`, `null` / `None`
//!
//! Column names that are not plain identifiers are written in back quotes.

mod eval;
mod lexer;
mod parser;

pub use eval::{compare, evaluate};
pub use parser::{CompareOp, FilterParser, Predicate};

use crate::error::{Result, RuntimeError};
use snax_core::types::value::format_timestamp;
use snax_core::{Table, Value};

/// Rows of `table` matching the filter expression `predicate`
pub fn filter_table(table: &Table, predicate: &str, source_name: &str) -> Result<Table> {
    let parsed = FilterParser::parse(predicate)?;
    let mask = evaluate(&parsed, table, source_name)?;
    Ok(table.filter(&mask))
}

/// Expression matching any of the key tuples in `key_values`.
///
/// Renders `(k1 == v11 and k2 == v12) or (k1 == v21 and k2 == v22) ...`;
/// an empty `key_values` yields `false`.
pub fn where_clause(key: &[String], key_values: &Table) -> Result<String> {
    let positions = key_values.column_indices(key)?;
    if key_values.is_empty() {
        return Ok("false".to_string());
    }
    let mut disjuncts = Vec::with_capacity(key_values.num_rows());
    for row in key_values.rows() {
        let mut conjuncts = Vec::with_capacity(key.len());
        for (name, &idx) in key.iter().zip(&positions) {
            conjuncts.push(format!("{} == {}", quote_ident(name), literal(&row[idx])?));
        }
        disjuncts.push(format!("({})", conjuncts.join(" and ")));
    }
    Ok(disjuncts.join(" or "))
}

/// Column name as it must appear in an expression
pub fn quote_ident(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    let reserved = matches!(
        name,
        "and" | "AND" | "or" | "OR" | "not" | "NOT" | "in" | "IN" | "true" | "True" | "TRUE"
            | "false" | "False" | "FALSE" | "null" | "None" | "NULL" | "contains"
            | "starts_with" | "ends_with"
    );
    if plain && !reserved {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Literal text for a value
pub fn literal(value: &Value) -> Result<String> {
    if value.is_null() {
        return Ok("null".to_string());
    }
    let text = match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_infinite() => {
            if *f > 0.0 {
                "1e999".to_string()
            } else {
                "-1e999".to_string()
            }
        }
        Value::Float(f) => format!("{:?}", f),
        Value::String(s) => quote_str(s),
        Value::Timestamp(ts) => quote_str(&format_timestamp(ts)),
        Value::List(_) | Value::Null => {
            return Err(RuntimeError::InvalidArgument(format!(
                "{} values cannot be used as key values",
                value.type_name()
            )))
        }
    };
    Ok(text)
}

fn quote_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::from_rows(
            vec!["id", "name", "age"],
            vec![
                vec![Value::Int(1), Value::from("John"), Value::Int(30)],
                vec![Value::Int(2), Value::from("O'Hara"), Value::Null],
                vec![Value::Int(3), Value::from("Jane"), Value::Int(25)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_where_clause_rendering() {
        let key_values = Table::from_rows(
            vec!["name", "id"],
            vec![
                vec![Value::from("O'Hara"), Value::Int(2)],
                vec![Value::from("John"), Value::Float(1.0)],
            ],
        )
        .unwrap();
        let clause = where_clause(&["id".to_string(), "name".to_string()], &key_values).unwrap();
        assert_eq!(
            clause,
            "(id == 2 and name == 'O\\'Hara') or (id == 1.0 and name == 'John')"
        );
    }

    #[test]
    fn test_where_clause_selects_key_rows() {
        let key_values = Table::from_rows(
            vec!["id", "name"],
            vec![
                vec![Value::Int(2), Value::from("O'Hara")],
                vec![Value::Int(3), Value::from("Nobody")],
            ],
        )
        .unwrap();
        let clause = where_clause(&["id".to_string(), "name".to_string()], &key_values).unwrap();
        let selected = filter_table(&people(), &clause, "people").unwrap();
        assert_eq!(selected.num_rows(), 1);
        assert_eq!(selected.get(0, 0), Some(&Value::Int(2)));
    }

    #[test]
    fn test_where_clause_empty_values() {
        let key_values = Table::new(vec!["id"]);
        let clause = where_clause(&["id".to_string()], &key_values).unwrap();
        assert_eq!(clause, "false");
        assert!(filter_table(&people(), &clause, "people").unwrap().is_empty());
    }

    #[test]
    fn test_where_clause_null_key() {
        let key_values = Table::from_rows(vec!["age"], vec![vec![Value::Null]]).unwrap();
        let clause = where_clause(&["age".to_string()], &key_values).unwrap();
        assert_eq!(clause, "(age == null)");
        let selected = filter_table(&people(), &clause, "people").unwrap();
        assert_eq!(selected.get(0, 1), Some(&Value::from("O'Hara")));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("user_id"), "user_id");
        assert_eq!(quote_ident("first name"), "`first name`");
        assert_eq!(quote_ident("in"), "`in`");
        assert_eq!(quote_ident("2nd"), "`2nd`");
    }

    #[test]
    fn test_filter_unknown_column() {
        let err = filter_table(&people(), "height > 2", "people").unwrap_err();
        assert!(matches!(err, RuntimeError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_filter_string_ops() {
        let selected =
            filter_table(&people(), "name starts_with 'J' and age >= 26", "people").unwrap();
        assert_eq!(selected.num_rows(), 1);
        assert_eq!(selected.get(0, 1), Some(&Value::from("John")));
    }
}
