//! In-memory data source
//!
//! Holds the whole table in process memory. Selection is copy-on-read and
//! inserts mutate the table in place. The file-backed source reuses the
//! select/insert functions defined here on its loaded table.

use crate::error::Result;
use crate::filter;
use crate::source::{missing_column, DataSource, SourceInfo};
use crate::upsert::{Incoming, RowAction};
use snax_core::{IfExists, RowKey, Table, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

static NULL: Value = Value::Null;

/// Rows matching `predicate`, projected onto `columns`
pub(crate) fn select_from(
    table: &Table,
    columns: Option<&[String]>,
    predicate: Option<&str>,
    source_name: &str,
) -> Result<Table> {
    let filtered = match predicate {
        Some(predicate) => filter::filter_table(table, predicate, source_name)?,
        None => table.clone(),
    };
    match columns {
        Some(columns) => filtered
            .project(columns)
            .map_err(|e| missing_column(source_name, e)),
        None => Ok(filtered),
    }
}

/// Upsert `key + columns` of `data` into `table`.
///
/// Nothing is modified if the insert is rejected.
pub(crate) fn insert_into(
    table: &mut Table,
    key: &[String],
    columns: &[String],
    data: &Table,
    if_exists: IfExists,
    source_name: &str,
) -> Result<()> {
    let incoming = Incoming::new(source_name, key, columns, data)?;

    let stored_columns = table.columns().to_vec();
    let missing_keys: Vec<&String> = key.iter().filter(|k| !table.has_column(k)).collect();

    // key columns not stored yet read as null for every stored row
    let key_positions: Vec<Option<usize>> = key.iter().map(|k| table.column_index(k)).collect();
    let mut index: HashMap<RowKey, usize> = HashMap::with_capacity(table.num_rows());
    for (position, row) in table.rows().iter().enumerate() {
        let cells = key_positions.iter().map(|p| p.map_or(&NULL, |i| &row[i]));
        let row_key = incoming.stored_key(cells);
        index.entry(row_key).or_insert(position);
    }

    let plan = incoming.plan(source_name, &stored_columns, if_exists, |row_key| {
        index.get(row_key).copied()
    })?;

    for name in missing_keys {
        table.add_column(name.clone());
    }
    for name in &plan.new_columns {
        table.add_column(name.clone());
    }

    let all_columns: Vec<String> = plan.data.columns().to_vec();
    let targets = table.column_indices(&all_columns)?;
    let value_offset = plan.key.len();
    let new_targets: Vec<(usize, usize)> = plan
        .new_columns
        .iter()
        .filter_map(|c| {
            let source = all_columns.iter().position(|a| a == c)?;
            Some((source, table.column_index(c)?))
        })
        .collect();

    let width = table.num_columns();
    let mut appended = Vec::new();
    for (row, action) in plan.rows() {
        match action {
            RowAction::Insert => {
                let mut stored = vec![Value::Null; width];
                for (value, &target) in row.iter().zip(&targets) {
                    stored[target] = value.clone();
                }
                appended.push(stored);
            }
            RowAction::Update(position) => {
                for (offset, &target) in targets.iter().enumerate().skip(value_offset) {
                    table.set(*position, target, row[offset].clone());
                }
            }
            RowAction::FillNew(position) => {
                for &(source, target) in &new_targets {
                    table.set(*position, target, row[source].clone());
                }
            }
            RowAction::Skip => {}
        }
    }
    for stored in appended {
        table.push_row(stored)?;
    }
    Ok(())
}

/// Data source backed by a table held in memory
#[derive(Debug)]
pub struct MemoryDataSource {
    info: SourceInfo,
    table: RwLock<Table>,
}

impl MemoryDataSource {
    /// Create a source named `name` holding `data`
    pub fn new(name: impl Into<String>, data: Table) -> Self {
        Self::with_info(SourceInfo::new(name), data)
    }

    pub fn with_info(info: SourceInfo, data: Table) -> Self {
        Self {
            info,
            table: RwLock::new(data),
        }
    }

    /// Copy of the stored table
    pub async fn snapshot(&self) -> Table {
        self.table.read().await.clone()
    }
}

#[async_trait::async_trait]
impl DataSource for MemoryDataSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn key_predicate(&self, key: &[String], key_values: &Table) -> Result<String> {
        filter::where_clause(key, key_values)
    }

    async fn select_fields(
        &self,
        columns: Option<&[String]>,
        predicate: Option<&str>,
    ) -> Result<Table> {
        let table = self.table.read().await;
        select_from(&table, columns, predicate, self.name())
    }

    async fn insert_fields(
        &self,
        key: &[String],
        columns: &[String],
        data: &Table,
        if_exists: IfExists,
    ) -> Result<()> {
        let mut table = self.table.write().await;
        insert_into(&mut table, key, columns, data, if_exists, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn people() -> Table {
        Table::from_rows(
            vec!["id", "name"],
            vec![
                vec![Value::Int(1), Value::from("John")],
                vec![Value::Int(2), Value::from("Jane")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_insert_replace_updates_in_place() {
        let mut table = people();
        let data =
            Table::from_rows(vec!["id", "name"], vec![vec![Value::Int(2), Value::from("Janet")]])
                .unwrap();
        insert_into(
            &mut table,
            &strings(&["id"]),
            &strings(&["name"]),
            &data,
            IfExists::Replace,
            "people",
        )
        .unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.row(1).unwrap(), &[Value::Int(2), Value::from("Janet")]);
        assert_eq!(table.row(0).unwrap(), &[Value::Int(1), Value::from("John")]);
    }

    #[test]
    fn test_insert_error_leaves_table_untouched() {
        let mut table = people();
        let data = Table::from_rows(
            vec!["id", "name", "age"],
            vec![
                vec![Value::Int(3), Value::from("Jim"), Value::Int(40)],
                vec![Value::Int(2), Value::from("Janet"), Value::Int(20)],
            ],
        )
        .unwrap();
        let err = insert_into(
            &mut table,
            &strings(&["id"]),
            &strings(&["name", "age"]),
            &data,
            IfExists::Error,
            "people",
        )
        .unwrap_err();
        assert!(matches!(err, RuntimeError::Conflict { rows: 1, .. }));
        assert_eq!(table, people());
    }

    #[test]
    fn test_insert_creates_missing_key_column() {
        let mut table = people();
        let data = Table::from_rows(
            vec!["day", "id", "name"],
            vec![vec![Value::Int(7), Value::Int(1), Value::from("Jo")]],
        )
        .unwrap();
        insert_into(
            &mut table,
            &strings(&["day", "id"]),
            &strings(&["name"]),
            &data,
            IfExists::Error,
            "people",
        )
        .unwrap();
        assert_eq!(table.columns(), &strings(&["id", "name", "day"])[..]);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(
            table.row(0).unwrap(),
            &[Value::Int(1), Value::from("John"), Value::Null]
        );
        assert_eq!(table.row(2).unwrap(), &[Value::Int(1), Value::from("Jo"), Value::Int(7)]);
    }

    #[test]
    fn test_insert_into_empty_table() {
        let mut table = Table::default();
        insert_into(
            &mut table,
            &strings(&["id"]),
            &strings(&["name"]),
            &people(),
            IfExists::Error,
            "people",
        )
        .unwrap();
        assert!(table.equals_unordered(&people()));
    }

    #[test]
    fn test_select_from_projects_after_filter() {
        let selected =
            select_from(&people(), Some(&strings(&["name"])), Some("id == 2"), "people").unwrap();
        assert_eq!(selected.columns(), &strings(&["name"])[..]);
        assert_eq!(selected.rows(), &[vec![Value::from("Jane")]]);
    }

    #[tokio::test]
    async fn test_select_is_copy_on_read() {
        let source = MemoryDataSource::new("people", people());
        let mut selected = source.select_fields(None, None).await.unwrap();
        selected.set(0, 1, Value::from("Changed"));
        assert_eq!(source.snapshot().await, people());
    }
}
