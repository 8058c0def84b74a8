//! In-memory representation of a loaded dataset.
//!
//! A [`Dataset`] is a read-only view over records that were loaded once. The
//! records sit behind an `Arc`, so filtering hands out a new view that shares
//! them instead of copying rows, and a dataset can be shared between threads.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::config::{ColumnType, EDITION, LANGUAGE};
use crate::error::{DataLoadError, InvalidParameterError};

/// A single cell.
///
/// Values are totally ordered (`Missing < Num < Str`, numbers by IEEE total
/// order, strings lexicographically) and hashable, so they can serve as group
/// keys and set members.
#[derive(Debug, Clone)]
pub enum Value {
    Missing,
    Num(f64),
    Str(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric reading of the value. Strings are parsed; anything that does
    /// not parse to a finite number yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => parse_number(s),
            Value::Missing => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Missing => 0,
            Value::Num(_) => 1,
            Value::Str(_) => 2,
        }
    }
}

/// Parse a cell as a finite number. `"27"`, `" 27.0 "` and `"2.7e1"` parse;
/// `""`, `"n/a"`, `"nan"` and `"inf"` do not.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Missing => {}
            Value::Num(n) => n.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Missing => serializer.serialize_none(),
            Value::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Num(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Num(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Num(f64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Num(n as f64)
    }
}

/// Named, typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

/// Ordered column list of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn push(&mut self, name: &str, ty: ColumnType) -> usize {
        self.columns.push(Column {
            name: name.to_string(),
            ty,
        });
        self.columns.len() - 1
    }
}

/// One row; values are positional and follow the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Missing)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Read-only view over loaded records.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: Arc<str>,
    schema: Arc<Schema>,
    id_column: Arc<str>,
    records: Arc<[Record]>,
    rows: Arc<[usize]>,
}

impl Dataset {
    /// Build a dataset from already-normalised records.
    ///
    /// Fails if the schema lacks `language`, `cop_edition` or the id column,
    /// or if a record's width does not match the schema.
    pub fn new(
        name: &str,
        schema: Schema,
        id_column: &str,
        records: Vec<Record>,
    ) -> Result<Self, DataLoadError> {
        for required in [LANGUAGE, EDITION, id_column] {
            if schema.index_of(required).is_none() {
                return Err(DataLoadError::MissingColumn {
                    path: name.into(),
                    column: required.to_string(),
                });
            }
        }
        if let Some((i, r)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.values.len() != schema.len())
        {
            return Err(DataLoadError::Config(format!(
                "dataset '{name}': record {i} has {} values, schema has {} columns",
                r.values.len(),
                schema.len()
            )));
        }
        let rows: Arc<[usize]> = (0..records.len()).collect();
        Ok(Self {
            name: name.into(),
            schema: Arc::new(schema),
            id_column: id_column.into(),
            records: records.into(),
            rows,
        })
    }

    /// Convenience constructor for small in-memory tables. Column types are
    /// taken as given; values are not normalised.
    pub fn from_rows(
        name: &str,
        columns: &[(&str, ColumnType)],
        id_column: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, DataLoadError> {
        let mut schema = Schema::default();
        for (col, ty) in columns {
            schema.push(col, *ty);
        }
        Dataset::new(name, schema, id_column, rows.into_iter().map(Record::new).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Column holding the unique row identifier.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Number of rows in this view.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Indices of the visible rows within the loaded records.
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows.iter().map(move |&i| &self.records[i])
    }

    pub(crate) fn indexed_records(&self) -> impl Iterator<Item = (usize, &Record)> + '_ {
        self.rows.iter().map(move |&i| (i, &self.records[i]))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, InvalidParameterError> {
        self.schema
            .index_of(name)
            .ok_or_else(|| InvalidParameterError::UnknownColumn(name.to_string()))
    }

    pub fn column_type(&self, name: &str) -> Result<ColumnType, InvalidParameterError> {
        let idx = self.column_index(name)?;
        Ok(self.schema.columns[idx].ty)
    }

    /// Values of one column across the visible rows.
    pub fn column(
        &self,
        name: &str,
    ) -> Result<impl Iterator<Item = &Value> + '_, InvalidParameterError> {
        let idx = self.column_index(name)?;
        Ok(self.records().map(move |r| r.get(idx)))
    }

    /// Number of distinct non-missing values in a column.
    pub fn count_distinct(&self, name: &str) -> Result<usize, InvalidParameterError> {
        let distinct: HashSet<&Value> = self.column(name)?.filter(|v| !v.is_missing()).collect();
        Ok(distinct.len())
    }

    /// New view over a subset of the loaded records.
    pub(crate) fn with_rows(&self, rows: Vec<usize>) -> Dataset {
        Dataset {
            name: Arc::clone(&self.name),
            schema: Arc::clone(&self.schema),
            id_column: Arc::clone(&self.id_column),
            records: Arc::clone(&self.records),
            rows: rows.into(),
        }
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.len() == other.len()
            && self.records().zip(other.records()).all(|(a, b)| a == b)
    }
}
