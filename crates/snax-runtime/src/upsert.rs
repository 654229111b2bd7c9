//! Insert reconciliation shared by all backends
//!
//! An insert is planned before anything is written: incoming rows are
//! collapsed per key, matched against stored rows, checked for conflicts and
//! turned into one action per row. Backends only supply the lookup of stored
//! keys and the write primitives.
//!
//! Conflicts are decided per row: an incoming row conflicts when its key is
//! already stored and at least one of its non-key columns is already a column
//! of the table. Under `IfExists::Error` a single conflicting row rejects the
//! whole insert.

use crate::error::{Result, RuntimeError};
use crate::source::missing_column;
use snax_core::cast::cast_value;
use snax_core::{IfExists, RowKey, Table, Value, ValueType};
use std::collections::HashMap;

/// What happens to one incoming row
#[derive(Debug, Clone, PartialEq)]
pub enum RowAction<P> {
    /// Key not stored yet: append the row
    Insert,
    /// Overwrite the stored row at all incoming columns
    Update(P),
    /// Write only the newly added columns into the stored row
    FillNew(P),
    /// Leave the stored row untouched
    Skip,
}

/// Validated, de-duplicated incoming data
#[derive(Debug, Clone)]
pub struct Incoming {
    key: Vec<String>,
    columns: Vec<String>,
    data: Table,
    keys: Vec<RowKey>,
    key_types: Vec<ValueType>,
}

impl Incoming {
    /// Prepare `key + columns` of `data` for reconciliation.
    ///
    /// Columns that are also key columns or repeated are dropped. Rows sharing
    /// a key collapse to the last one, at the position of the first.
    pub fn new(
        source_name: &str,
        key: &[String],
        columns: &[String],
        data: &Table,
    ) -> Result<Self> {
        if key.is_empty() {
            return Err(RuntimeError::InvalidArgument(format!(
                "{}: key must contain at least one column",
                source_name
            )));
        }

        let mut value_columns: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            if !key.contains(column) && !value_columns.contains(column) {
                value_columns.push(column.clone());
            }
        }

        let mut all_columns = key.to_vec();
        all_columns.extend(value_columns.iter().cloned());
        let projected = data
            .project(&all_columns)
            .map_err(|e| missing_column(source_name, e))?;

        let key_positions: Vec<usize> = (0..key.len()).collect();
        let mut seen: HashMap<RowKey, usize> = HashMap::new();
        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(projected.num_rows());
        let mut keys = Vec::with_capacity(projected.num_rows());
        for row in projected.into_rows() {
            let row_key = RowKey::from_row(&row, &key_positions);
            match seen.get(&row_key) {
                Some(&idx) => rows[idx] = row,
                None => {
                    seen.insert(row_key.clone(), rows.len());
                    keys.push(row_key);
                    rows.push(row);
                }
            }
        }
        if rows.len() < data.num_rows() {
            tracing::debug!(
                "{}: collapsed {} incoming row(s) with repeated keys",
                source_name,
                data.num_rows() - rows.len()
            );
        }

        let data = Table::from_rows(all_columns, rows)?;
        let key_types = (0..key.len())
            .map(|i| ValueType::infer(data.rows().iter().map(|row| &row[i])))
            .collect();
        Ok(Self {
            key: key.to_vec(),
            columns: value_columns,
            data,
            keys,
            key_types,
        })
    }

    pub fn key(&self) -> &[String] {
        &self.key
    }

    /// Non-key incoming columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Incoming `key + columns` rows
    pub fn data(&self) -> &Table {
        &self.data
    }

    /// Key of each incoming row
    pub fn row_keys(&self) -> &[RowKey] {
        &self.keys
    }

    /// Key of a stored row, with its cells read as the incoming key types.
    ///
    /// Storage may hand back a bool key as `0`/`1` or a timestamp as text;
    /// those are converted so they match the incoming keys. Cells that do not
    /// convert are kept as they are.
    pub fn stored_key<'a, I>(&self, values: I) -> RowKey
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let aligned: Vec<Value> = values
            .into_iter()
            .zip(&self.key_types)
            .map(|(value, &target)| align_key_value(value, target))
            .collect();
        RowKey::new(&aligned)
    }

    /// Incoming non-key columns that are already stored
    pub fn overlap(&self, stored: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| stored.contains(c))
            .cloned()
            .collect()
    }

    /// Incoming non-key columns that are not stored yet
    pub fn new_columns(&self, stored: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !stored.contains(c))
            .cloned()
            .collect()
    }

    /// Decide an action for every incoming row.
    ///
    /// `lookup` returns the backend-specific position of the stored row with
    /// a key, if any. Fails with `RuntimeError::Conflict` before any action is
    /// produced when the policy is `Error` and some row conflicts.
    pub fn plan<P, F>(
        self,
        source_name: &str,
        stored: &[String],
        if_exists: IfExists,
        mut lookup: F,
    ) -> Result<UpsertPlan<P>>
    where
        F: FnMut(&RowKey) -> Option<P>,
    {
        let overlap = self.overlap(stored);
        let new_columns = self.new_columns(stored);
        let matches: Vec<Option<P>> = self.keys.iter().map(&mut lookup).collect();

        let conflicts = if overlap.is_empty() {
            0
        } else {
            matches.iter().filter(|m| m.is_some()).count()
        };
        if if_exists == IfExists::Error && conflicts > 0 {
            return Err(RuntimeError::Conflict {
                source_name: source_name.to_string(),
                rows: conflicts,
                columns: overlap,
            });
        }

        let actions: Vec<RowAction<P>> = matches
            .into_iter()
            .map(|m| match m {
                None => RowAction::Insert,
                Some(position) => match if_exists {
                    IfExists::Error | IfExists::Replace => RowAction::Update(position),
                    IfExists::Ignore if !new_columns.is_empty() => RowAction::FillNew(position),
                    IfExists::Ignore => RowAction::Skip,
                },
            })
            .collect();

        let plan = UpsertPlan {
            key: self.key,
            columns: self.columns,
            new_columns,
            data: self.data,
            actions,
        };
        tracing::debug!(
            "{}: insert plan with {} new, {} updated, {} skipped row(s), new columns [{}]",
            source_name,
            plan.count(|a| matches!(a, RowAction::Insert)),
            plan.count(|a| matches!(a, RowAction::Update(_) | RowAction::FillNew(_))),
            plan.count(|a| matches!(a, RowAction::Skip)),
            plan.new_columns.join(", ")
        );
        Ok(plan)
    }
}

fn align_key_value(value: &Value, target: ValueType) -> Value {
    let convertible = matches!(
        (target, value),
        (ValueType::Bool, Value::Int(_) | Value::Float(_))
            | (ValueType::Int | ValueType::Float, Value::Bool(_))
            | (ValueType::Timestamp, Value::String(_))
    );
    if !convertible {
        return value.clone();
    }
    match cast_value(value, target) {
        Value::Null => value.clone(),
        aligned => aligned,
    }
}

/// Row-level actions for one insert
#[derive(Debug, Clone)]
pub struct UpsertPlan<P> {
    pub key: Vec<String>,
    pub columns: Vec<String>,
    pub new_columns: Vec<String>,
    pub data: Table,
    pub actions: Vec<RowAction<P>>,
}

impl<P> UpsertPlan<P> {
    fn count(&self, pred: impl Fn(&RowAction<P>) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(a)).count()
    }

    /// Incoming rows paired with their action
    pub fn rows(&self) -> impl Iterator<Item = (&[Value], &RowAction<P>)> {
        self.data
            .rows()
            .iter()
            .map(Vec::as_slice)
            .zip(self.actions.iter())
    }

    /// `key + columns` restricted to the rows accepted by `pred`
    pub fn subset(
        &self,
        columns: &[String],
        pred: impl Fn(&RowAction<P>) -> bool,
    ) -> Result<Table> {
        let mut wanted = self.key.clone();
        wanted.extend(columns.iter().cloned());
        let mask: Vec<bool> = self.actions.iter().map(|a| pred(a)).collect();
        Ok(self.data.filter(&mask).project(&wanted)?)
    }
}
