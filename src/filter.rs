//! Dimension filtering.
//!
//! A [`FilterSelection`] maps dimension names to sets of allowed values.
//! Across dimensions the constraints are combined with AND, within one
//! dimension any selected value matches.
//!
//! An **empty** set means the dimension is not constrained at all. This is the
//! "multiselect defaults to every option" convention of the dashboard, not a
//! "match nothing" rule.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::config::{ColumnType, EDITION, LANGUAGE};
use crate::dataset::{Dataset, Value};
use crate::error::InvalidParameterError;

/// Selected values per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    dimensions: BTreeMap<String, BTreeSet<Value>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the allowed values of `dimension`, replacing any earlier choice.
    pub fn select<I, V>(mut self, dimension: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.dimensions.insert(
            dimension.to_string(),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn languages<I, S>(self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select(LANGUAGE, languages.into_iter().map(Into::<String>::into))
    }

    pub fn editions<I>(self, editions: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        self.select(EDITION, editions)
    }

    pub fn get(&self, dimension: &str) -> Option<&BTreeSet<Value>> {
        self.dimensions.get(dimension)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &BTreeSet<Value>)> + '_ {
        self.dimensions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy of this selection restricted to the named dimensions.
    pub fn only(&self, keep: &[&str]) -> FilterSelection {
        FilterSelection {
            dimensions: self
                .dimensions
                .iter()
                .filter(|(k, _)| keep.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// One active constraint, bound to a column position.
struct Constraint {
    column: usize,
    allowed: BTreeSet<Value>,
}

impl Constraint {
    fn build(
        dataset: &Dataset,
        dimension: &str,
        selected: &BTreeSet<Value>,
    ) -> Result<Self, InvalidParameterError> {
        let column = dataset.column_index(dimension)?;
        let allowed = match dataset.column_type(dimension)? {
            // Unparseable selections drop out and can never match.
            ColumnType::Number => selected
                .iter()
                .filter_map(Value::as_number)
                .map(Value::Num)
                .collect(),
            _ => selected
                .iter()
                .filter(|v| !v.is_missing())
                .map(|v| match v {
                    Value::Num(_) => Value::Str(v.to_string()),
                    other => other.clone(),
                })
                .collect(),
        };
        Ok(Self { column, allowed })
    }

    fn matches(&self, value: &Value) -> bool {
        !value.is_missing() && self.allowed.contains(value)
    }
}

/// Rows of `dataset` that satisfy every non-empty dimension of `selection`.
///
/// The source dataset is left untouched; the result is a new view over the
/// same records and may be empty. Naming a dimension the dataset does not have
/// is an error, even with an empty set.
pub fn filter(
    dataset: &Dataset,
    selection: &FilterSelection,
) -> Result<Dataset, InvalidParameterError> {
    let mut constraints = Vec::new();
    for (dimension, selected) in selection.dimensions() {
        dataset.column_index(dimension)?;
        if selected.is_empty() {
            continue;
        }
        constraints.push(Constraint::build(dataset, dimension, selected)?);
    }
    if constraints.is_empty() {
        return Ok(dataset.clone());
    }

    let rows: Vec<usize> = dataset
        .indexed_records()
        .filter(|(_, record)| constraints.iter().all(|c| c.matches(record.get(c.column))))
        .map(|(i, _)| i)
        .collect();
    debug!(
        "filter on '{}' kept {} of {} rows",
        dataset.name(),
        rows.len(),
        dataset.len()
    );
    Ok(dataset.with_rows(rows))
}

/// Sorted distinct non-missing values of a dimension: the options a caller can
/// offer for selection.
pub fn dimension_options(
    dataset: &Dataset,
    dimension: &str,
) -> Result<Vec<Value>, InvalidParameterError> {
    let values: BTreeSet<Value> = dataset
        .column(dimension)?
        .filter(|v| !v.is_missing())
        .cloned()
        .collect();
    Ok(values.into_iter().collect())
}
