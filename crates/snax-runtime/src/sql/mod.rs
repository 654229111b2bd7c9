//! Relational data source
//!
//! Stores one logical table in a PostgreSQL or SQLite database. The table is
//! created on first use and widened as new feature columns arrive; a unique
//! constraint on the insert key backs the upsert.
//!
//! Inserts are staged: rows are written into `<table>_tmp` and merged into
//! the target with one statement (`MERGE` on PostgreSQL 15+, `INSERT ... ON
//! CONFLICT` on SQLite). The `_tmp` name is reserved for staging; it is
//! dropped after every merge, also when the merge fails.

pub mod dialect;
#[cfg(feature = "sqlx")]
mod pool;
pub mod types;

pub use dialect::SqlDialect;
#[cfg(feature = "sqlx")]
pub use pool::SqlPool;
pub use types::ColumnTypeMap;

#[cfg(feature = "sqlx")]
pub use source::SqlDataSource;

#[cfg(feature = "sqlx")]
mod source {
    use super::dialect::PLACEHOLDER_COLUMN;
    use super::{ColumnTypeMap, SqlDialect, SqlPool};
    use crate::error::{Result, RuntimeError};
    use crate::source::{DataSource, SourceInfo};
    use crate::upsert::{Incoming, RowAction};
    use snax_core::{IfExists, RowKey, Table, ValueType};
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    /// Rows per staged `INSERT` statement
    const INSERT_CHUNK: usize = 500;

    /// Keys per lookup query
    const LOOKUP_CHUNK: usize = 500;

    /// Data source backed by a database table
    #[derive(Debug)]
    pub struct SqlDataSource {
        info: SourceInfo,
        pool: SqlPool,
        schema: String,
        table: String,
        column_types: ColumnTypeMap,
        write_lock: Mutex<()>,
    }

    impl SqlDataSource {
        /// Open `schema.table`, creating the table if it does not exist.
        ///
        /// `schema` defaults to `public` on PostgreSQL and `main` on SQLite.
        pub async fn new(
            info: SourceInfo,
            pool: impl Into<SqlPool>,
            schema: Option<String>,
            table: impl Into<String>,
        ) -> Result<Self> {
            let pool = pool.into();
            let schema = schema.unwrap_or_else(|| match pool.dialect() {
                SqlDialect::Postgres => "public".to_string(),
                SqlDialect::Sqlite => "main".to_string(),
            });
            let source = Self {
                info,
                pool,
                schema,
                table: table.into(),
                column_types: ColumnTypeMap::default(),
                write_lock: Mutex::new(()),
            };
            source.ensure_table().await?;
            Ok(source)
        }

        /// Override the column types used for new columns
        pub fn with_column_types(mut self, column_types: ColumnTypeMap) -> Self {
            self.column_types = column_types;
            self
        }

        pub fn dialect(&self) -> SqlDialect {
            self.pool.dialect()
        }

        pub fn pool(&self) -> &SqlPool {
            &self.pool
        }

        pub fn schema(&self) -> &str {
            &self.schema
        }

        pub fn table(&self) -> &str {
            &self.table
        }

        fn target(&self) -> String {
            format!("{}.{}", self.schema, self.table)
        }

        fn db_error(&self, source: sqlx::Error) -> RuntimeError {
            RuntimeError::Database {
                target: self.target(),
                source,
            }
        }

        async fn execute(&self, sql: &str) -> Result<u64> {
            self.pool.execute(sql).await.map_err(|e| self.db_error(e))
        }

        async fn ensure_table(&self) -> Result<()> {
            let dialect = self.dialect();
            match self
                .pool
                .execute(&dialect.table_exists_check(&self.schema, &self.table))
                .await
            {
                Ok(_) => Ok(()),
                Err(e) if is_missing_table(&e) => {
                    self.execute(&dialect.create_table(&self.schema, &self.table))
                        .await?;
                    tracing::info!("Created table {}", self.target());
                    Ok(())
                }
                Err(e) => Err(self.db_error(e)),
            }
        }

        /// Drop the table
        pub async fn delete(&self) -> Result<()> {
            self.drop_if_exists(&self.table).await?;
            tracing::info!("Dropped table {}", self.target());
            Ok(())
        }

        async fn drop_if_exists(&self, table: &str) -> Result<()> {
            match self
                .pool
                .execute(&self.dialect().drop_table(&self.schema, table))
                .await
            {
                Ok(_) => Ok(()),
                Err(e) if is_missing_table(&e) => Ok(()),
                Err(e) => Err(self.db_error(e)),
            }
        }

        /// All physical columns, including the SQLite placeholder
        async fn physical_columns(&self) -> Result<Vec<String>> {
            let sql = self.dialect().list_columns(&self.schema, &self.table);
            self.pool
                .fetch_strings(&sql)
                .await
                .map_err(|e| self.db_error(e))
        }

        /// Stored column names
        pub async fn columns(&self) -> Result<Vec<String>> {
            Ok(self
                .physical_columns()
                .await?
                .into_iter()
                .filter(|c| c != PLACEHOLDER_COLUMN)
                .collect())
        }

        async fn add_columns(&self, names: &[String], data: &Table) -> Result<()> {
            let dialect = self.dialect();
            for name in names {
                let values = data.column(name)?;
                let value_type = ValueType::infer(&values);
                let sql_type = self.column_types.sql_type(dialect, value_type);
                self.execute(&dialect.add_column(&self.schema, &self.table, name, &sql_type))
                    .await?;
                tracing::info!("{}: added column {} {}", self.target(), name, sql_type);
            }
            Ok(())
        }

        async fn ensure_unique(&self, key: &[String]) -> Result<()> {
            let sql = self
                .dialect()
                .add_unique_constraint(&self.schema, &self.table, key);
            match self.pool.execute(&sql).await {
                Ok(_) => {
                    tracing::debug!("{}: unique constraint on ({})", self.target(), key.join(", "));
                    Ok(())
                }
                Err(e) if is_already_exists(&e) => Ok(()),
                Err(e) => Err(self.db_error(e)),
            }
        }

        /// Keys of `incoming` that are already stored
        async fn lookup(&self, incoming: &Incoming) -> Result<HashSet<RowKey>> {
            let key = incoming.key();
            let key_values = incoming.data().project(key)?;
            let mut found = HashSet::new();
            for chunk in key_values.rows().chunks(LOOKUP_CHUNK) {
                let chunk_table = Table::from_rows(key.to_vec(), chunk.to_vec())?;
                let predicate = self.dialect().key_predicate(key, &chunk_table)?;
                let sql = self
                    .dialect()
                    .select(&self.schema, &self.table, Some(key), Some(&predicate));
                let stored = self
                    .pool
                    .fetch_table(&sql, key.to_vec())
                    .await
                    .map_err(|e| self.db_error(e))?;
                // SQLite hands bools back as integers and timestamps as text
                found.extend(stored.rows().iter().map(|row| incoming.stored_key(row)));
            }
            Ok(found)
        }

        /// Upsert `data` (key columns first) on `key`, overwriting `columns`
        async fn merge(&self, key: &[String], columns: &[String], data: &Table) -> Result<()> {
            if data.is_empty() {
                return Ok(());
            }
            let staging = format!("{}_tmp", self.table);
            self.drop_if_exists(&staging).await?;
            let merged = self.stage_and_merge(&staging, key, columns, data).await;
            let dropped = self.drop_if_exists(&staging).await;
            let merged = merged?;
            dropped?;
            tracing::debug!("{}: merged {} row(s)", self.target(), merged);
            Ok(())
        }

        async fn stage_and_merge(
            &self,
            staging: &str,
            key: &[String],
            columns: &[String],
            data: &Table,
        ) -> Result<u64> {
            let dialect = self.dialect();
            let mut all_columns = key.to_vec();
            all_columns.extend(columns.iter().cloned());

            self.execute(&dialect.create_staging(&self.schema, &self.table, staging, &all_columns))
                .await?;
            for statement in dialect.insert_values(&self.schema, staging, data, INSERT_CHUNK) {
                self.execute(&statement).await?;
            }
            self.execute(&dialect.merge(&self.schema, &self.table, staging, key, columns))
                .await
        }
    }

    #[async_trait::async_trait]
    impl DataSource for SqlDataSource {
        fn info(&self) -> &SourceInfo {
            &self.info
        }

        fn key_predicate(&self, key: &[String], key_values: &Table) -> Result<String> {
            self.dialect().key_predicate(key, key_values)
        }

        async fn select_fields(
            &self,
            columns: Option<&[String]>,
            predicate: Option<&str>,
        ) -> Result<Table> {
            let stored = self.columns().await?;
            let columns = match columns {
                Some(columns) => {
                    if let Some(missing) = columns.iter().find(|c| !stored.contains(c)) {
                        return Err(RuntimeError::ColumnNotFound {
                            column: missing.clone(),
                            source_name: self.name().to_string(),
                        });
                    }
                    columns.to_vec()
                }
                None => stored,
            };
            if columns.is_empty() {
                return Ok(Table::default());
            }
            let sql = self
                .dialect()
                .select(&self.schema, &self.table, Some(&columns), predicate);
            self.pool
                .fetch_table(&sql, columns)
                .await
                .map_err(|e| self.db_error(e))
        }

        async fn insert_fields(
            &self,
            key: &[String],
            columns: &[String],
            data: &Table,
            if_exists: IfExists,
        ) -> Result<()> {
            let _guard = self.write_lock.lock().await;
            let incoming = Incoming::new(self.name(), key, columns, data)?;

            let physical = self.physical_columns().await?;
            let stored: Vec<String> = physical
                .iter()
                .filter(|c| c.as_str() != PLACEHOLDER_COLUMN)
                .cloned()
                .collect();
            let missing_keys: Vec<String> =
                key.iter().filter(|k| !stored.contains(k)).cloned().collect();

            // stored rows cannot match on a key column that does not exist yet
            let existing = if missing_keys.is_empty() {
                self.lookup(&incoming).await?
            } else {
                HashSet::new()
            };

            let plan = incoming.plan(self.name(), &stored, if_exists, |row_key| {
                existing.contains(row_key).then_some(())
            })?;

            self.add_columns(&missing_keys, &plan.data).await?;
            self.add_columns(&plan.new_columns, &plan.data).await?;
            if physical.iter().any(|c| c == PLACEHOLDER_COLUMN)
                && (!missing_keys.is_empty() || !plan.new_columns.is_empty())
            {
                let drop =
                    self.dialect().drop_column(&self.schema, &self.table, PLACEHOLDER_COLUMN);
                self.execute(&drop).await?;
            }
            self.ensure_unique(&plan.key).await?;

            let fill = plan.subset(&plan.new_columns, |a| matches!(a, RowAction::FillNew(_)))?;
            self.merge(&plan.key, &plan.new_columns, &fill).await?;

            let upsert = plan.subset(&plan.columns, |a| {
                matches!(a, RowAction::Insert | RowAction::Update(_))
            })?;
            self.merge(&plan.key, &plan.columns, &upsert).await?;

            tracing::info!(
                "{}: inserted {} row(s), filled {} row(s)",
                self.target(),
                upsert.num_rows(),
                fill.num_rows()
            );
            Ok(())
        }
    }

    /// Undefined table (PostgreSQL 42P01) or SQLite's "no such table"
    fn is_missing_table(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db) => {
                db.code().as_deref() == Some("42P01") || db.message().contains("no such table")
            }
            _ => false,
        }
    }

    /// Duplicate relation or object (PostgreSQL 42P07 / 42710) or SQLite's
    /// "already exists"
    fn is_already_exists(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db) => {
                matches!(db.code().as_deref(), Some("42P07") | Some("42710"))
                    || db.message().contains("already exists")
            }
            _ => false,
        }
    }
}
