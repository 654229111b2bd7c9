//! Connection pools and row decoding

use super::dialect::SqlDialect;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use snax_core::{Table, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Pool for one of the supported databases
#[derive(Debug, Clone)]
pub enum SqlPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl From<PgPool> for SqlPool {
    fn from(pool: PgPool) -> Self {
        SqlPool::Postgres(pool)
    }
}

impl From<SqlitePool> for SqlPool {
    fn from(pool: SqlitePool) -> Self {
        SqlPool::Sqlite(pool)
    }
}

impl SqlPool {
    pub async fn connect(
        dialect: SqlDialect,
        connection_string: &str,
        max_connections: u32,
    ) -> Result<Self, sqlx::Error> {
        let pool = match dialect {
            SqlDialect::Postgres => SqlPool::Postgres(
                PgPoolOptions::new()
                    .max_connections(max_connections)
                    .connect(connection_string)
                    .await?,
            ),
            SqlDialect::Sqlite => SqlPool::Sqlite(
                SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect(connection_string)
                    .await?,
            ),
        };
        tracing::info!("Connected {} pool ({} max connections)", dialect, max_connections);
        Ok(pool)
    }

    pub fn dialect(&self) -> SqlDialect {
        match self {
            SqlPool::Postgres(_) => SqlDialect::Postgres,
            SqlPool::Sqlite(_) => SqlDialect::Sqlite,
        }
    }

    /// Run a statement, returning the number of affected rows.
    ///
    /// Statements are not cached: the schema changes under them.
    pub async fn execute(&self, sql: &str) -> Result<u64, sqlx::Error> {
        tracing::debug!("execute: {}", abbreviate(sql));
        let affected = match self {
            SqlPool::Postgres(pool) => sqlx::query(sql)
                .persistent(false)
                .execute(pool)
                .await?
                .rows_affected(),
            SqlPool::Sqlite(pool) => sqlx::query(sql)
                .persistent(false)
                .execute(pool)
                .await?
                .rows_affected(),
        };
        Ok(affected)
    }

    /// Run a query whose result columns are exactly `columns`
    pub async fn fetch_table(&self, sql: &str, columns: Vec<String>) -> Result<Table, sqlx::Error> {
        tracing::debug!("fetch: {}", abbreviate(sql));
        let width = columns.len();
        let rows = match self {
            SqlPool::Postgres(pool) => {
                let rows = sqlx::query(sql).persistent(false).fetch_all(pool).await?;
                rows.iter()
                    .map(|row| (0..width).map(|i| decode_pg(row, i)).collect())
                    .collect::<Result<Vec<Vec<Value>>, _>>()?
            }
            SqlPool::Sqlite(pool) => {
                let rows = sqlx::query(sql).persistent(false).fetch_all(pool).await?;
                rows.iter()
                    .map(|row| (0..width).map(|i| decode_sqlite(row, i)).collect())
                    .collect::<Result<Vec<Vec<Value>>, _>>()?
            }
        };
        Table::from_rows(columns, rows).map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    /// First column of every row as text
    pub async fn fetch_strings(&self, sql: &str) -> Result<Vec<String>, sqlx::Error> {
        match self {
            SqlPool::Postgres(pool) => {
                let rows = sqlx::query(sql).persistent(false).fetch_all(pool).await?;
                rows.iter().map(|row| row.try_get::<String, _>(0)).collect()
            }
            SqlPool::Sqlite(pool) => {
                let rows = sqlx::query(sql).persistent(false).fetch_all(pool).await?;
                rows.iter().map(|row| row.try_get::<String, _>(0)).collect()
            }
        }
    }
}

fn abbreviate(sql: &str) -> &str {
    const MAX: usize = 200;
    match sql.char_indices().nth(MAX) {
        Some((end, _)) => &sql[..end],
        None => sql,
    }
}

fn decode_pg(row: &PgRow, index: usize) -> Result<Value, sqlx::Error> {
    let type_name = row.column(index).type_info().name().to_uppercase();
    let value = match type_name.as_str() {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(|v| Value::Int(v.into())),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(|v| Value::Int(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::Int),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(|v| Value::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(Value::Float),
        "NUMERIC" => row
            .try_get::<Option<bigdecimal::BigDecimal>, _>(index)?
            .and_then(|v| v.to_string().parse::<f64>().ok())
            .map(Value::Float),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(Value::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|v| Value::Timestamp(v.naive_utc())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Value::Timestamp),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(index)?.map(Value::String)
        }
        other => match row.try_get::<Option<String>, _>(index) {
            Ok(text) => text.map(Value::String),
            Err(_) => {
                tracing::warn!(
                    "Column '{}' has unsupported type {}, reading as null",
                    row.column(index).name(),
                    other
                );
                None
            }
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

fn decode_sqlite(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    // storage class of the value itself, not the declared column type
    let storage = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_uppercase()
    };
    let value = match storage.as_str() {
        "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => {
            Value::Int(row.try_get::<i64, _>(index)?)
        }
        "REAL" | "FLOAT" | "DOUBLE" => Value::Float(row.try_get::<f64, _>(index)?),
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}
