//! In-memory record accumulation and tabular export.
//!
//! Records are kept in arrival order. The column schema is fixed only when the
//! sink is flushed, from the first record, and every other record is checked
//! against it.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::error::{CrawlError, SchemaError};

/// One value of an exported row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map_or(Cell::Null, Cell::Text)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Null, Cell::Float)
    }
}

impl From<Option<u32>> for Cell {
    fn from(value: Option<u32>) -> Self {
        value.map_or(Cell::Null, |v| Cell::Int(i64::from(v)))
    }
}

impl From<&Cell> for Value {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(i) => Value::from(*i),
            // NaN and infinities have no JSON form
            Cell::Float(x) => serde_json::Number::from_f64(*x).map_or(Value::Null, Value::Number),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }
}

/// A record that can be laid out as a table row
pub trait TableRow {
    /// Named cells in column order
    fn cells(&self) -> Vec<(&'static str, Cell)>;
}

/// Thread-safe, append-only record collector
pub struct RecordSink<T> {
    records: Mutex<Vec<T>>,
}

impl<T: TableRow> RecordSink<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn append(&self, record: T) {
        self.records.lock().push(record);
    }

    pub fn extend(&self, records: impl IntoIterator<Item = T>) {
        self.records.lock().extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drain every accumulated record into a table.
    ///
    /// The first record fixes the columns. Any later record whose column set
    /// differs fails the whole flush.
    pub fn flush(&self) -> Result<SerializedTable, SchemaError> {
        let records = std::mem::take(&mut *self.records.lock());

        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let (names, cells): (Vec<_>, Vec<_>) = record.cells().into_iter().unzip();
            let names: Vec<String> = names.into_iter().map(str::to_string).collect();

            match &columns {
                None => columns = Some(names),
                Some(expected) if *expected != names => {
                    return Err(SchemaError::ColumnMismatch {
                        row: index,
                        expected: expected.clone(),
                        found: names,
                    });
                }
                Some(_) => {}
            }

            rows.push(cells);
        }

        debug!("Flushed {} records from sink", rows.len());

        Ok(SerializedTable {
            columns: columns.unwrap_or_default(),
            rows,
        })
    }
}

impl<T: TableRow> Default for RecordSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Flushed rows sharing one column schema
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SerializedTable {
    /// Write a header row plus one line per record. Nulls become empty cells.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<(), CrawlError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.columns)?;
        for row in &self.rows {
            csv.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<(), CrawlError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        self.write_csv(file)?;
        debug!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    /// Rows as JSON objects with keys in column order
    pub fn to_json(&self) -> Value {
        let objects = self
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(Value::from))
                    .collect();
                Value::Object(object)
            })
            .collect();
        Value::Array(objects)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), CrawlError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_json())?;
        std::fs::write(path, json)?;
        debug!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}
