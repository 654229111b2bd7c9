//! Row-major tabular data
//!
//! `Table` is what data sources accept and return: an ordered list of column
//! names and rows of `Value`s, one value per column. Column names may repeat
//! when a caller projects the same column twice.

use super::row_key::RowKey;
use super::value::Value;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tabular data with named columns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "TableDef", into = "TableDef")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a table from rows. Every row must have one value per column.
    pub fn from_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Table::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Create a table from `(name, values)` pairs of equal length
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<Value>)>) -> Result<Self> {
        let num_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut names = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            let name = name.into();
            if values.len() != num_rows {
                return Err(CoreError::InvalidArgument(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    num_rows
                )));
            }
            names.push(name);
            data.push(values.into_iter());
        }
        let rows = (0..num_rows)
            .map(|_| data.iter_mut().map(|it| it.next().unwrap_or(Value::Null)).collect())
            .collect();
        Ok(Self {
            columns: names,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column with this name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Positions of the given columns, failing on the first missing one
    pub fn column_indices<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.column_index(name)
                    .ok_or_else(|| CoreError::ColumnNotFound(name.to_string()))
            })
            .collect()
    }

    /// Values of a column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<Value>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| CoreError::ColumnNotFound(name.to_string()))?;
        Ok(self.rows.iter().map(|row| row[idx].clone()).collect())
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Overwrite one cell. Out-of-range positions are ignored.
    pub fn set(&mut self, row: usize, column: usize, value: Value) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value;
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(CoreError::InvalidArgument(format!(
                "row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a column filled with nulls and return its position
    pub fn add_column(&mut self, name: impl Into<String>) -> usize {
        self.columns.push(name.into());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }

    /// Replace the values of a column, adding it if absent
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(CoreError::InvalidArgument(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => self.add_column(name),
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        Ok(())
    }

    /// New table with only the given columns, in the given order
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let indices = self.column_indices(names)?;
        Ok(Table {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// New table with the rows whose mask entry is true
    pub fn filter(&self, mask: &[bool]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(row, _)| row.clone())
                .collect(),
        }
    }

    /// Rename columns through a mapping; unmapped names are kept
    pub fn rename_columns(&mut self, mapping: &HashMap<String, String>) {
        for column in &mut self.columns {
            if let Some(renamed) = mapping.get(column) {
                *column = renamed.clone();
            }
        }
    }

    /// Row keys over the given columns, in row order
    pub fn row_keys<S: AsRef<str>>(&self, key: &[S]) -> Result<Vec<RowKey>> {
        let positions = self.column_indices(key)?;
        Ok(self
            .rows
            .iter()
            .map(|row| RowKey::from_row(row, &positions))
            .collect())
    }

    /// Compare two tables ignoring row order and column order.
    ///
    /// Both tables must have the same set of column names; rows are compared
    /// as multisets after aligning columns by name.
    pub fn equals_unordered(&self, other: &Table) -> bool {
        if self.num_columns() != other.num_columns() || self.num_rows() != other.num_rows() {
            return false;
        }
        let mut names = self.columns.clone();
        names.sort();
        let mut other_names = other.columns.clone();
        other_names.sort();
        if names != other_names {
            return false;
        }
        let (Ok(mut left), Ok(mut right)) = (self.row_keys(&names), other.row_keys(&names)) else {
            return false;
        };
        left.sort();
        right.sort();
        left == right
    }
}

/// Serialized form of a table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableDef {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl TryFrom<TableDef> for Table {
    type Error = CoreError;

    fn try_from(def: TableDef) -> Result<Self> {
        Table::from_rows(def.columns, def.rows)
    }
}

impl From<Table> for TableDef {
    fn from(table: Table) -> Self {
        TableDef {
            columns: table.columns,
            rows: table.rows,
        }
    }
}
