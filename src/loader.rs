//! Reads delimited files into a [`Dataset`], applying the normalisation the
//! rest of the pipeline relies on:
//!
//! - source headers are renamed to canonical names through the declared aliases;
//! - missing categorical cells receive their column sentinel;
//! - numeric columns (always including `cop_edition`) are coerced, and cells
//!   that do not parse become [`Value::Missing`] while the row is kept.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::{ColumnType, DatasetSpec, EDITION, LANGUAGE};
use crate::dataset::{Dataset, Record, Schema, Value, parse_number};
use crate::error::DataLoadError;

/// Name of the ordinal column synthesised when a dataset has no id column.
pub const ROW_ID: &str = "row_id";

/// Raw contents of one source file, headers already canonical.
struct RawPart {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Load one dataset. Its files are read in parallel and concatenated in the
/// order they are declared.
pub fn load(spec: &DatasetSpec) -> Result<Dataset, DataLoadError> {
    if spec.paths.is_empty() {
        return Err(DataLoadError::NoSources(spec.name.clone()));
    }
    let delimiter = spec.delimiter_byte()?;
    let parts: Vec<RawPart> = spec
        .paths
        .par_iter()
        .map(|p| read_part(spec, p, delimiter))
        .collect::<Result<_, _>>()?;
    let dataset = assemble(spec, parts)?;
    info!(
        "loaded dataset '{}': {} rows from {} file(s)",
        spec.name,
        dataset.len(),
        spec.paths.len()
    );
    Ok(dataset)
}

/// Load several datasets concurrently. Results keep the order of `specs`.
pub fn load_all(specs: &[DatasetSpec]) -> Result<Vec<Dataset>, DataLoadError> {
    specs.par_iter().map(load).collect()
}

fn read_part(spec: &DatasetSpec, path: &Path, delimiter: u8) -> Result<RawPart, DataLoadError> {
    let file = File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_err = |source: csv::Error| DataLoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| spec.canonical(h).to_string())
        .collect();

    let mut required = vec![LANGUAGE, EDITION];
    if let Some(id) = spec.id_column.as_deref() {
        required.push(id);
    }
    for column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(DataLoadError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    debug!("read {} rows from {}", rows.len(), path.display());
    Ok(RawPart {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

/// Merge parts under one schema (union of their columns in first-seen order)
/// and normalise every cell.
fn assemble(spec: &DatasetSpec, parts: Vec<RawPart>) -> Result<Dataset, DataLoadError> {
    let mut schema = Schema::default();
    for part in &parts {
        for h in &part.headers {
            if schema.index_of(h).is_none() {
                schema.push(h, spec.column_type(h));
            }
        }
    }
    let id_column = match spec.id_column.as_deref() {
        Some(id) => id.to_string(),
        None => {
            if schema.index_of(ROW_ID).is_some() {
                return Err(DataLoadError::Config(format!(
                    "dataset '{}' has a '{ROW_ID}' column but no id column; declare it as the id",
                    spec.name
                )));
            }
            schema.push(ROW_ID, ColumnType::Number);
            ROW_ID.to_string()
        }
    };
    let synthetic_id = spec.id_column.is_none();

    let columns: Vec<(ColumnType, Option<String>)> = schema
        .columns()
        .iter()
        .map(|c| (c.ty, spec.sentinel(&c.name).map(str::to_string)))
        .collect();

    let mut records = Vec::new();
    let mut coerced = vec![0usize; schema.len()];
    for part in parts {
        let positions: Vec<Option<usize>> = schema
            .columns()
            .iter()
            .map(|c| part.headers.iter().position(|h| *h == c.name))
            .collect();
        for raw in &part.rows {
            let ordinal = records.len();
            let values = positions
                .iter()
                .zip(&columns)
                .enumerate()
                .map(|(i, (pos, (ty, sentinel)))| {
                    if synthetic_id && i == schema.len() - 1 {
                        return Value::from(ordinal as u64);
                    }
                    let cell = pos.and_then(|p| raw.get(p)).map(String::as_str);
                    let (value, was_coerced) = normalize_cell(cell, *ty, sentinel.as_deref());
                    if was_coerced {
                        coerced[i] += 1;
                    }
                    value
                })
                .collect();
            records.push(Record::new(values));
        }
        debug!("normalised rows of {}", part.path.display());
    }

    for (column, n) in schema.columns().iter().zip(&coerced) {
        if *n > 0 {
            warn!(
                "dataset '{}': {} value(s) in '{}' are not numeric and were treated as missing",
                spec.name, n, column.name
            );
        }
    }

    Dataset::new(&spec.name, schema, &id_column, records)
}

/// Normalise one raw cell. The flag reports a non-empty cell that failed
/// numeric coercion.
fn normalize_cell(cell: Option<&str>, ty: ColumnType, sentinel: Option<&str>) -> (Value, bool) {
    let text = cell.map(str::trim).filter(|s| !s.is_empty());
    let fill = || sentinel.map(Value::from).unwrap_or(Value::Missing);
    match (ty, text) {
        (_, None) => (fill(), false),
        (ColumnType::Number, Some(s)) => match parse_number(s) {
            Some(n) => (Value::Num(n), false),
            None => (Value::Missing, true),
        },
        (_, Some(s)) => (Value::from(s), false),
    }
}
