//! Delimited-text file data source
//!
//! The file is loaded into memory on first access; a missing or empty file is
//! an empty table. Selection runs on the loaded table exactly like the
//! in-memory source.
//!
//! Every insert rewrites the whole file. Many small inserts into a large file
//! therefore cost O(inserts x file size); batch rows into fewer inserts when
//! that matters.

use crate::error::{Result, RuntimeError};
use crate::filter;
use crate::memory::{insert_into, select_from};
use crate::source::{DataSource, SourceInfo};
use snax_core::cast::{guess_timestamp_format, parse_timestamp};
use snax_core::{IfExists, Table, Value, ValueType};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Default field separator
pub const DEFAULT_SEPARATOR: u8 = b',';

/// Data source backed by a CSV (or other single-byte delimited) file
#[derive(Debug)]
pub struct FileDataSource {
    info: SourceInfo,
    path: PathBuf,
    separator: u8,
    table: RwLock<Option<Table>>,
}

impl FileDataSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_info(SourceInfo::new(name), path)
    }

    pub fn with_info(info: SourceInfo, path: impl Into<PathBuf>) -> Self {
        Self {
            info,
            path: path.into(),
            separator: DEFAULT_SEPARATOR,
            table: RwLock::new(None),
        }
    }

    /// Use a different field separator
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn separator(&self) -> u8 {
        self.separator
    }

    async fn load(&self) -> Result<Table> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{}: {} does not exist yet", self.name(), self.path.display());
                return Ok(Table::default());
            }
            Err(source) => {
                return Err(RuntimeError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let table = parse_delimited(&bytes, self.separator).map_err(|source| RuntimeError::Csv {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(
            "{}: loaded {} row(s) x {} column(s) from {}",
            self.name(),
            table.num_rows(),
            table.num_columns(),
            self.path.display()
        );
        Ok(table)
    }

    async fn dump(&self, table: &Table) -> Result<()> {
        let bytes = write_delimited(table, self.separator).map_err(|source| RuntimeError::Csv {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RuntimeError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|source| RuntimeError::Io {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(
            "{}: wrote {} row(s) to {}",
            self.name(),
            table.num_rows(),
            self.path.display()
        );
        Ok(())
    }

    async fn ensure_loaded(&self) -> Result<()> {
        if self.table.read().await.is_some() {
            return Ok(());
        }
        let mut guard = self.table.write().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DataSource for FileDataSource {
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
        self.ensure_loaded().await?;
        let guard = self.table.read().await;
        match guard.as_ref() {
            Some(table) => select_from(table, columns, predicate, self.name()),
            None => select_from(&Table::default(), columns, predicate, self.name()),
        }
    }

    async fn insert_fields(
        &self,
        key: &[String],
        columns: &[String],
        data: &Table,
        if_exists: IfExists,
    ) -> Result<()> {
        let mut guard = self.table.write().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let table = guard.get_or_insert_with(Table::default);
        insert_into(table, key, columns, data, if_exists, self.name())?;
        self.dump(table).await
    }
}

/// Parse delimited text with a header row.
///
/// Empty cells are null. Each column gets the narrowest type all of its
/// populated cells parse as: int, float, timestamp, bool, otherwise string.
/// Only text carrying both a date and a time reads as a timestamp.
pub fn parse_delimited(bytes: &[u8], separator: u8) -> std::result::Result<Table, csv::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Table::default());
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .from_reader(bytes);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); columns.len()];
    for record in reader.records() {
        let record = record?;
        for (i, column) in cells.iter_mut().enumerate() {
            let cell = record.get(i).filter(|c| !c.is_empty()).map(str::to_string);
            column.push(cell);
        }
    }

    let typed: Vec<(String, Vec<Value>)> = columns
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| {
            let values = convert_column(raw);
            (name, values)
        })
        .collect();
    Table::from_columns(typed).map_err(|e| {
        csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

fn convert_column(raw: Vec<Option<String>>) -> Vec<Value> {
    let populated = || raw.iter().flatten();
    let format = populated().next().and_then(|sample| datetime_format(sample));
    let column_type = if populated().all(|c| c.trim().parse::<i64>().is_ok()) {
        ValueType::Int
    } else if populated().all(|c| c.trim().parse::<f64>().is_ok()) {
        ValueType::Float
    } else if format.is_some()
        && populated().all(|c| parse_timestamp(c, format.as_deref()).is_some())
    {
        ValueType::Timestamp
    } else if populated().all(|c| parse_bool(c).is_some()) {
        ValueType::Bool
    } else {
        ValueType::String
    };
    raw.into_iter()
        .map(|cell| match cell {
            None => Value::Null,
            Some(text) => match column_type {
                ValueType::Int => text.trim().parse().map(Value::Int).unwrap_or(Value::Null),
                ValueType::Float => text.trim().parse().map(Value::Float).unwrap_or(Value::Null),
                ValueType::Timestamp => parse_timestamp(&text, format.as_deref())
                    .map(Value::Timestamp)
                    .unwrap_or(Value::Null),
                ValueType::Bool => parse_bool(&text).map(Value::Bool).unwrap_or(Value::Null),
                _ => Value::String(text),
            },
        })
        .collect()
}

/// Format of a cell holding a date and a time
fn datetime_format(sample: &str) -> Option<String> {
    let format = guess_timestamp_format(&[Value::from(sample)])?;
    let has_date = format.contains("%Y") || format.contains("%d");
    (has_date && format.contains("%H")).then_some(format)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        t if t.eq_ignore_ascii_case("true") => Some(true),
        t if t.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Render a table as delimited text with a header row and no index column
pub fn write_delimited(table: &Table, separator: u8) -> std::result::Result<Vec<u8>, csv::Error> {
    if table.num_columns() == 0 {
        return Ok(Vec::new());
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(separator)
        .from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(render_cell))?;
    }
    writer
        .into_inner()
        .map_err(|e| {
            csv::Error::from(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })
}

fn render_cell(value: &Value) -> String {
    match value {
        v if v.is_null() => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::List(_) => value.to_json().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_infers_column_types() {
        let text = b"id,score,active,name,mixed\n1,1.5,True,John,1\n2,,false,,x\n";
        let table = parse_delimited(text, b',').unwrap();
        assert_eq!(
            table.row(0).unwrap(),
            &[
                Value::Int(1),
                Value::Float(1.5),
                Value::Bool(true),
                Value::from("John"),
                Value::from("1"),
            ]
        );
        assert_eq!(
            table.row(1).unwrap(),
            &[Value::Int(2), Value::Null, Value::Bool(false), Value::Null, Value::from("x")]
        );
    }

    #[test]
    fn test_parse_reads_datetimes_back() {
        let text = b"ts,day,clock,label\n\
            2021-01-01T10:00:00,2021-01-01,10:00,x\n\
            2021-01-02 11:30:00.5,,,2021-01-01T10:00:00\n";
        let table = parse_delimited(text, b',').unwrap();
        let first = parse_timestamp("2021-01-01T10:00:00", None).unwrap();
        let second = parse_timestamp("2021-01-02T11:30:00.5", None).unwrap();
        assert_eq!(table.get(0, 0), Some(&Value::Timestamp(first)));
        assert_eq!(table.get(1, 0), Some(&Value::Timestamp(second)));
        // date-only, time-only and mixed columns stay text
        assert_eq!(table.get(0, 1), Some(&Value::from("2021-01-01")));
        assert_eq!(table.get(0, 2), Some(&Value::from("10:00")));
        assert_eq!(table.get(1, 3), Some(&Value::from("2021-01-01T10:00:00")));

        let written = String::from_utf8(write_delimited(&table, b',').unwrap()).unwrap();
        assert!(written.contains("2021-01-02T11:30:00.500"));
        assert_eq!(parse_delimited(written.as_bytes(), b',').unwrap(), table);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_delimited(b"", b',').unwrap(), Table::default());
        assert_eq!(parse_delimited(b"  \n", b',').unwrap(), Table::default());
        let header_only = parse_delimited(b"id;name\n", b';').unwrap();
        assert_eq!(header_only.columns(), &["id".to_string(), "name".to_string()]);
        assert!(header_only.is_empty());
    }

    #[test]
    fn test_write_keeps_float_marker_and_quotes() {
        let table = Table::from_rows(
            vec!["id", "score", "name", "tags"],
            vec![vec![
                Value::Int(1),
                Value::Float(2.0),
                Value::from("Doe, John"),
                Value::from(vec!["a", "b"]),
            ]],
        )
        .unwrap();
        let text = String::from_utf8(write_delimited(&table, b',').unwrap()).unwrap();
        assert_eq!(text, "id,score,name,tags\n1,2.0,\"Doe, John\",\"[\"\"a\"\",\"\"b\"\"]\"\n");

        let parsed = parse_delimited(text.as_bytes(), b',').unwrap();
        assert_eq!(parsed.get(0, 1), Some(&Value::Float(2.0)));
        assert_eq!(parsed.get(0, 3), Some(&Value::from(r#"["a","b"]"#)));
    }
}
