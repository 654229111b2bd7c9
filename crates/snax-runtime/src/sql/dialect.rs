//! SQL text generation for the supported dialects

use crate::error::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use snax_core::types::value::format_timestamp;
use snax_core::{Table, Value};
use std::fmt;

/// Name of the column SQLite tables are created with; SQLite cannot create a
/// table without columns. It is dropped once a real column exists.
pub const PLACEHOLDER_COLUMN: &str = "snax_placeholder";

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[serde(alias = "postgresql")]
    Postgres,
    Sqlite,
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Postgres => write!(f, "postgres"),
            SqlDialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Double-quoted identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated quoted identifiers
pub fn ident_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SQL literal for a value.
///
/// Nulls (and NaN) become `NULL`, strings are single-quoted with quotes
/// doubled, booleans become `0` / `1`, numbers are unquoted, timestamps are
/// quoted ISO text and lists are quoted JSON text.
pub fn literal(value: &Value) -> String {
    if value.is_null() {
        return "NULL".to_string();
    }
    match value {
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_infinite() => "NULL".to_string(),
        Value::Float(f) => format!("{:?}", f),
        Value::String(s) => quote_str(s),
        Value::Timestamp(ts) => quote_str(&format_timestamp(ts)),
        Value::List(_) => quote_str(&value.to_json().to_string()),
        Value::Null => "NULL".to_string(),
    }
}

fn quote_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn row_literal(row: &[Value], positions: &[usize]) -> String {
    let values: Vec<String> = positions.iter().map(|&i| literal(&row[i])).collect();
    format!("({})", values.join(", "))
}

impl SqlDialect {
    /// `"schema"."table"`
    pub fn qualified(&self, schema: &str, table: &str) -> String {
        format!("{}.{}", quote_ident(schema), quote_ident(table))
    }

    pub fn table_exists_check(&self, schema: &str, table: &str) -> String {
        format!("SELECT * FROM {} LIMIT 0", self.qualified(schema, table))
    }

    pub fn create_table(&self, schema: &str, table: &str) -> String {
        match self {
            SqlDialect::Postgres => format!("CREATE TABLE {} ()", self.qualified(schema, table)),
            SqlDialect::Sqlite => format!(
                "CREATE TABLE {} ({} INTEGER)",
                self.qualified(schema, table),
                quote_ident(PLACEHOLDER_COLUMN)
            ),
        }
    }

    pub fn drop_table(&self, schema: &str, table: &str) -> String {
        format!("DROP TABLE {}", self.qualified(schema, table))
    }

    /// Query listing the table's column names in order
    pub fn list_columns(&self, schema: &str, table: &str) -> String {
        match self {
            SqlDialect::Postgres => format!(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = {} AND table_name = {} ORDER BY ordinal_position",
                quote_str(schema),
                quote_str(table)
            ),
            SqlDialect::Sqlite => format!(
                "SELECT name FROM pragma_table_info({}, {}) ORDER BY cid",
                quote_str(table),
                quote_str(schema)
            ),
        }
    }

    pub fn add_column(&self, schema: &str, table: &str, column: &str, sql_type: &str) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.qualified(schema, table),
            quote_ident(column),
            sql_type
        )
    }

    pub fn drop_column(&self, schema: &str, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.qualified(schema, table),
            quote_ident(column)
        )
    }

    /// `SCHEMA_TABLE_K1_K2_unique`
    pub fn constraint_name(&self, schema: &str, table: &str, key: &[String]) -> String {
        let prefix = format!("{}_{}_{}", schema, table, key.join("_")).to_uppercase();
        format!("{}_unique", prefix)
    }

    pub fn add_unique_constraint(&self, schema: &str, table: &str, key: &[String]) -> String {
        let name = self.constraint_name(schema, table, key);
        match self {
            SqlDialect::Postgres => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                self.qualified(schema, table),
                quote_ident(&name),
                ident_list(key)
            ),
            SqlDialect::Sqlite => format!(
                "CREATE UNIQUE INDEX {} ON {} ({})",
                self.qualified(schema, &name),
                quote_ident(table),
                ident_list(key)
            ),
        }
    }

    /// `SELECT <columns | *> FROM schema.table [WHERE predicate]`
    pub fn select(
        &self,
        schema: &str,
        table: &str,
        columns: Option<&[String]>,
        predicate: Option<&str>,
    ) -> String {
        let projection = match columns {
            Some(columns) if !columns.is_empty() => ident_list(columns),
            _ => "*".to_string(),
        };
        let mut sql = format!("SELECT {} FROM {}", projection, self.qualified(schema, table));
        if let Some(predicate) = predicate {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        sql
    }

    /// Membership predicate matching any key tuple of `key_values`.
    ///
    /// PostgreSQL compares against a list of row constructors, SQLite against
    /// a `VALUES` subquery. An empty `key_values` matches nothing.
    pub fn key_predicate(&self, key: &[String], key_values: &Table) -> Result<String> {
        if key.is_empty() {
            return Err(RuntimeError::InvalidArgument(
                "key must contain at least one column".to_string(),
            ));
        }
        let positions = key_values.column_indices(key)?;
        if key_values.is_empty() {
            return Ok("1 = 0".to_string());
        }
        let tuples: Vec<String> = key_values
            .rows()
            .iter()
            .map(|row| row_literal(row, &positions))
            .collect();
        let lhs = format!("({})", ident_list(key));
        Ok(match self {
            SqlDialect::Postgres => format!("{} IN ({})", lhs, tuples.join(", ")),
            SqlDialect::Sqlite => format!("{} IN (VALUES {})", lhs, tuples.join(", ")),
        })
    }

    /// Empty staging table with the column types of the target
    pub fn create_staging(
        &self,
        schema: &str,
        table: &str,
        staging: &str,
        columns: &[String],
    ) -> String {
        format!(
            "CREATE TABLE {} AS SELECT {} FROM {} WHERE 1 = 0",
            self.qualified(schema, staging),
            ident_list(columns),
            self.qualified(schema, table)
        )
    }

    /// Multi-row `INSERT ... VALUES` statements, `chunk_size` rows each
    pub fn insert_values(
        &self,
        schema: &str,
        table: &str,
        data: &Table,
        chunk_size: usize,
    ) -> Vec<String> {
        let positions: Vec<usize> = (0..data.num_columns()).collect();
        let columns = ident_list(data.columns());
        data.rows()
            .chunks(chunk_size.max(1))
            .map(|chunk| {
                let rows: Vec<String> =
                    chunk.iter().map(|row| row_literal(row, &positions)).collect();
                format!(
                    "INSERT INTO {} ({}) VALUES {}",
                    self.qualified(schema, table),
                    columns,
                    rows.join(", ")
                )
            })
            .collect()
    }

    /// Single statement merging the staging table into the target on `key`:
    /// matched rows get `columns` updated, unmatched rows are inserted
    pub fn merge(
        &self,
        schema: &str,
        table: &str,
        staging: &str,
        key: &[String],
        columns: &[String],
    ) -> String {
        let target = self.qualified(schema, table);
        let source = self.qualified(schema, staging);
        let mut all_columns = key.to_vec();
        all_columns.extend(columns.iter().cloned());

        match self {
            SqlDialect::Postgres => {
                let on = key
                    .iter()
                    .map(|k| format!("target.{0} = source.{0}", quote_ident(k)))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                let mut sql = format!(
                    "MERGE INTO {} AS target USING {} AS source ON ({})",
                    target, source, on
                );
                if !columns.is_empty() {
                    let set = columns
                        .iter()
                        .map(|c| format!("{0} = source.{0}", quote_ident(c)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    sql.push_str(&format!(" WHEN MATCHED THEN UPDATE SET {}", set));
                }
                let values = all_columns
                    .iter()
                    .map(|c| format!("source.{}", quote_ident(c)))
                    .collect::<Vec<_>>()
                    .join(", ");
                sql.push_str(&format!(
                    " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
                    ident_list(&all_columns),
                    values
                ));
                sql
            }
            SqlDialect::Sqlite => {
                let action = if columns.is_empty() {
                    "DO NOTHING".to_string()
                } else {
                    let set = columns
                        .iter()
                        .map(|c| format!("{0} = excluded.{0}", quote_ident(c)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("DO UPDATE SET {}", set)
                };
                format!(
                    "INSERT INTO {} ({cols}) SELECT {cols} FROM {} WHERE true ON CONFLICT ({}) {}",
                    target,
                    source,
                    ident_list(key),
                    action,
                    cols = ident_list(&all_columns)
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal(&Value::Null), "NULL");
        assert_eq!(literal(&Value::Float(f64::NAN)), "NULL");
        assert_eq!(literal(&Value::from("O'Brien")), "'O''Brien'");
        assert_eq!(literal(&Value::Bool(true)), "1");
        assert_eq!(literal(&Value::Bool(false)), "0");
        assert_eq!(literal(&Value::Int(-4)), "-4");
        assert_eq!(literal(&Value::Float(2.5)), "2.5");
        assert_eq!(literal(&Value::from(vec![1, 2])), "'[1,2]'");
    }

    #[test]
    fn test_key_predicate() {
        let key_values = Table::from_rows(
            vec!["name", "id"],
            vec![
                vec![Value::from("a"), Value::Int(1)],
                vec![Value::Null, Value::Int(2)],
            ],
        )
        .unwrap();
        let key = strings(&["id", "name"]);
        assert_eq!(
            SqlDialect::Postgres.key_predicate(&key, &key_values).unwrap(),
            "(\"id\", \"name\") IN ((1, 'a'), (2, NULL))"
        );
        assert_eq!(
            SqlDialect::Sqlite.key_predicate(&key, &key_values).unwrap(),
            "(\"id\", \"name\") IN (VALUES (1, 'a'), (2, NULL))"
        );
        assert_eq!(
            SqlDialect::Postgres
                .key_predicate(&key, &Table::new(vec!["id", "name"]))
                .unwrap(),
            "1 = 0"
        );
    }

    #[test]
    fn test_constraint_name() {
        let name =
            SqlDialect::Postgres.constraint_name("public", "users", &strings(&["id", "day"]));
        assert_eq!(name, "PUBLIC_USERS_ID_DAY_unique");
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            SqlDialect::Postgres.create_table("public", "users"),
            "CREATE TABLE \"public\".\"users\" ()"
        );
        assert_eq!(
            SqlDialect::Sqlite.create_table("main", "users"),
            "CREATE TABLE \"main\".\"users\" (\"snax_placeholder\" INTEGER)"
        );
    }

    #[test]
    fn test_merge_postgres() {
        let sql =
            SqlDialect::Postgres.merge("s", "t", "t_tmp", &strings(&["id"]), &strings(&["name"]));
        assert_eq!(
            sql,
            "MERGE INTO \"s\".\"t\" AS target USING \"s\".\"t_tmp\" AS source \
             ON (target.\"id\" = source.\"id\") \
             WHEN MATCHED THEN UPDATE SET \"name\" = source.\"name\" \
             WHEN NOT MATCHED THEN INSERT (\"id\", \"name\") \
             VALUES (source.\"id\", source.\"name\")"
        );
        let key_only = SqlDialect::Postgres.merge("s", "t", "t_tmp", &strings(&["id"]), &[]);
        assert!(!key_only.contains("WHEN MATCHED"));
    }

    #[test]
    fn test_merge_sqlite() {
        let sql =
            SqlDialect::Sqlite.merge("main", "t", "t_tmp", &strings(&["id"]), &strings(&["name"]));
        assert_eq!(
            sql,
            "INSERT INTO \"main\".\"t\" (\"id\", \"name\") \
             SELECT \"id\", \"name\" FROM \"main\".\"t_tmp\" \
             WHERE true ON CONFLICT (\"id\") DO UPDATE SET \"name\" = excluded.\"name\""
        );
        assert!(SqlDialect::Sqlite
            .merge("main", "t", "t_tmp", &strings(&["id"]), &[])
            .ends_with("DO NOTHING"));
    }

    #[test]
    fn test_insert_values_chunks() {
        let data = Table::from_rows(
            vec!["id"],
            (0..5).map(|i| vec![Value::Int(i)]).collect(),
        )
        .unwrap();
        let statements = SqlDialect::Sqlite.insert_values("main", "t", &data, 2);
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[2],
            "INSERT INTO \"main\".\"t\" (\"id\") VALUES (4)"
        );
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
