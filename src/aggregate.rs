//! Group-by aggregation.
//!
//! [`aggregate`] buckets rows by one or two key expressions and computes a
//! [`Metric`] per bucket. [`explode_and_count`] handles columns that pack
//! several values into one delimited cell.
//!
//! Results carry no ordering guarantee; see [`crate::rank`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::dataset::{Dataset, Value};
use crate::error::InvalidParameterError;

/// How a group key is derived from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyExpr {
    /// The column value as stored.
    Column(String),
    /// Calendar date (`YYYY-MM-DD`) of a timestamp column. Timestamps that do
    /// not parse keep their raw text.
    Day(String),
    /// Column value with a trailing `(TYPE)` tag removed, so that
    /// `"boris johnson (PER)"` groups as `"boris johnson"`.
    EntityLabel(String),
}

impl KeyExpr {
    pub fn column(&self) -> &str {
        match self {
            KeyExpr::Column(c) | KeyExpr::Day(c) | KeyExpr::EntityLabel(c) => c,
        }
    }

    /// Header used when the key is shown in a table.
    pub fn label(&self) -> String {
        match self {
            KeyExpr::Column(c) => c.clone(),
            KeyExpr::Day(_) => "day".to_string(),
            KeyExpr::EntityLabel(c) => format!("{c}_label"),
        }
    }

    fn eval(&self, value: &Value) -> Value {
        match (self, value) {
            (KeyExpr::Day(_), Value::Str(s)) => day_of(s)
                .map(|d| Value::Str(d.format("%Y-%m-%d").to_string()))
                .unwrap_or_else(|| value.clone()),
            (KeyExpr::EntityLabel(_), Value::Str(s)) => Value::from(strip_type_tag(s)),
            _ => value.clone(),
        }
    }
}

impl From<&str> for KeyExpr {
    fn from(column: &str) -> Self {
        KeyExpr::Column(column.to_string())
    }
}

/// Calendar date of a timestamp in one of the shapes found in the corpus.
pub fn day_of(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    // Twitter API style: "Tue Nov 08 10:00:00 +0000 2022"
    if let Ok(dt) = DateTime::parse_from_str(s, "%a %b %d %H:%M:%S %z %Y") {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// `"boris johnson (PER)"` -> `"boris johnson"`. Text without a non-empty
/// trailing parenthesised tag is returned unchanged.
pub fn strip_type_tag(label: &str) -> &str {
    let Some(body) = label.strip_suffix(')') else {
        return label;
    };
    match body.rfind('(') {
        Some(open) if open + 1 < body.len() && !body[open + 1..].contains(')') => {
            body[..open].trim_end()
        }
        _ => label,
    }
}

/// Quantity computed per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metric {
    /// Number of rows.
    CountRows,
    /// Number of distinct non-missing values of a column (usually the post id,
    /// since one post can appear once per label).
    CountDistinct(String),
    /// Sum of a numeric column; missing cells add nothing.
    Sum(String),
}

impl Metric {
    /// Header used when the metric is shown in a table.
    pub fn label(&self) -> String {
        match self {
            Metric::CountRows => "count".to_string(),
            Metric::CountDistinct(c) => format!("distinct_{c}"),
            Metric::Sum(c) => c.clone(),
        }
    }
}

/// Identifies one bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Single(Value),
    Pair(Value, Value),
}

impl GroupKey {
    pub fn primary(&self) -> &Value {
        match self {
            GroupKey::Single(v) | GroupKey::Pair(v, _) => v,
        }
    }

    pub fn secondary(&self) -> Option<&Value> {
        match self {
            GroupKey::Single(_) => None,
            GroupKey::Pair(_, v) => Some(v),
        }
    }

    pub fn values(&self) -> Vec<Value> {
        match self {
            GroupKey::Single(v) => vec![v.clone()],
            GroupKey::Pair(a, b) => vec![a.clone(), b.clone()],
        }
    }
}

/// A metric value: counts stay integral, sums are floating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(u64),
    Sum(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Count(n) => n as f64,
            MetricValue::Sum(x) => x,
        }
    }

    /// Total order used by ranking.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (MetricValue::Count(a), MetricValue::Count(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }

    /// Sum of two values; stays a count only if both are counts.
    pub fn add(self, other: Self) -> Self {
        match (self, other) {
            (MetricValue::Count(a), MetricValue::Count(b)) => MetricValue::Count(a + b),
            _ => MetricValue::Sum(self.as_f64() + other.as_f64()),
        }
    }
}

impl From<MetricValue> for Value {
    fn from(m: MetricValue) -> Self {
        Value::Num(m.as_f64())
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{n}"),
            MetricValue::Sum(x) => write!(f, "{}", Value::Num(*x)),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Count(n) => serializer.serialize_u64(*n),
            MetricValue::Sum(x) => Value::Num(*x).serialize(serializer),
        }
    }
}

/// Grouped metric values. No key appears twice.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    key_labels: Vec<String>,
    metric_label: String,
    rows: Vec<(GroupKey, MetricValue)>,
}

impl Aggregation {
    pub fn new(
        key_labels: Vec<String>,
        metric_label: impl Into<String>,
        rows: Vec<(GroupKey, MetricValue)>,
    ) -> Self {
        Self {
            key_labels,
            metric_label: metric_label.into(),
            rows,
        }
    }

    pub fn key_labels(&self) -> &[String] {
        &self.key_labels
    }

    pub fn metric_label(&self) -> &str {
        &self.metric_label
    }

    pub fn rows(&self) -> &[(GroupKey, MetricValue)] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<(GroupKey, MetricValue)> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when keys are (primary, secondary) pairs.
    pub fn is_paired(&self) -> bool {
        self.key_labels.len() == 2
    }

    pub fn get(&self, key: &GroupKey) -> Option<MetricValue> {
        self.rows.iter().find(|(k, _)| k == key).map(|(_, m)| *m)
    }

    pub(crate) fn with_rows(&self, rows: Vec<(GroupKey, MetricValue)>) -> Self {
        Self {
            key_labels: self.key_labels.clone(),
            metric_label: self.metric_label.clone(),
            rows,
        }
    }
}

enum Accumulator {
    Count(u64),
    Distinct(HashSet<Value>),
    Sum(f64),
}

impl Accumulator {
    fn finish(self) -> MetricValue {
        match self {
            Accumulator::Count(n) => MetricValue::Count(n),
            Accumulator::Distinct(set) => MetricValue::Count(set.len() as u64),
            Accumulator::Sum(x) => MetricValue::Sum(x),
        }
    }
}

/// Group `dataset` by one or two key expressions and compute `metric` per
/// group. Only groups with at least one row are emitted.
pub fn aggregate(
    dataset: &Dataset,
    group_by: &[KeyExpr],
    metric: &Metric,
) -> Result<Aggregation, InvalidParameterError> {
    if group_by.is_empty() || group_by.len() > 2 {
        return Err(InvalidParameterError::GroupArity(group_by.len()));
    }
    let key_columns = group_by
        .iter()
        .map(|k| dataset.column_index(k.column()))
        .collect::<Result<Vec<_>, _>>()?;
    let metric_column = match metric {
        Metric::CountRows => None,
        Metric::CountDistinct(c) | Metric::Sum(c) => Some(dataset.column_index(c)?),
    };

    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for record in dataset.records() {
        let mut parts = group_by
            .iter()
            .zip(&key_columns)
            .map(|(expr, &col)| expr.eval(record.get(col)));
        let key = match (parts.next(), parts.next()) {
            (Some(a), Some(b)) => GroupKey::Pair(a, b),
            (Some(a), None) => GroupKey::Single(a),
            (None, _) => continue,
        };
        let acc = groups.entry(key).or_insert_with(|| match metric {
            Metric::CountRows => Accumulator::Count(0),
            Metric::CountDistinct(_) => Accumulator::Distinct(HashSet::new()),
            Metric::Sum(_) => Accumulator::Sum(0.0),
        });
        let cell = metric_column.map(|c| record.get(c));
        match acc {
            Accumulator::Count(n) => *n += 1,
            Accumulator::Distinct(set) => {
                if let Some(v) = cell.filter(|v| !v.is_missing()) {
                    set.insert(v.clone());
                }
            }
            Accumulator::Sum(total) => {
                if let Some(x) = cell.and_then(Value::as_number) {
                    *total += x;
                }
            }
        }
    }

    Ok(Aggregation::new(
        group_by.iter().map(KeyExpr::label).collect(),
        metric.label(),
        groups.into_iter().map(|(k, acc)| (k, acc.finish())).collect(),
    ))
}

/// Count delimited tokens of `column` across all rows.
///
/// Each non-missing cell is split on `delimiter`; tokens are trimmed and empty
/// ones dropped. Every occurrence counts, including repeats within one cell.
pub fn explode_and_count(
    dataset: &Dataset,
    column: &str,
    delimiter: &str,
) -> Result<Aggregation, InvalidParameterError> {
    if delimiter.is_empty() {
        return Err(InvalidParameterError::EmptyDelimiter);
    }
    let col = dataset.column_index(column)?;
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for record in dataset.records() {
        let cell = match record.get(col) {
            Value::Missing => continue,
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        };
        for token in cell.split(delimiter).map(str::trim).filter(|t| !t.is_empty()) {
            *counts.entry(token.to_string()).or_insert(0) += 1;
        }
    }
    Ok(Aggregation::new(
        vec![column.to_string()],
        "count",
        counts
            .into_iter()
            .map(|(token, n)| (GroupKey::Single(Value::Str(token)), MetricValue::Count(n)))
            .collect(),
    ))
}
