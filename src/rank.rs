//! Ordering and top-N truncation of aggregation results.
//!
//! Rows are ordered by metric descending; equal metrics fall back to the group
//! key ascending, which makes every ranking deterministic.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregation, GroupKey, MetricValue};
use crate::dataset::Value;
use crate::error::InvalidParameterError;

/// Where the top-N cut is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// One ranking over all groups.
    #[default]
    Global,
    /// A separate ranking inside each primary key of a two-key result.
    PerPrimaryKey,
}

/// Reject `n == 0` before any work is done.
pub fn check_top_n(n: usize) -> Result<(), InvalidParameterError> {
    if n == 0 {
        Err(InvalidParameterError::NonPositiveTopN)
    } else {
        Ok(())
    }
}

fn by_rank(a: &(GroupKey, MetricValue), b: &(GroupKey, MetricValue)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Sort and keep the first `n` rows, either overall or within each primary
/// key. Fewer than `n` groups are returned as they are.
///
/// With [`Scope::PerPrimaryKey`] the output is grouped by primary key in
/// ascending order, each group ranked on its own.
pub fn rank_and_truncate(
    result: Aggregation,
    n: usize,
    scope: Scope,
) -> Result<Aggregation, InvalidParameterError> {
    check_top_n(n)?;
    if scope == Scope::PerPrimaryKey && !result.is_paired() {
        return Err(InvalidParameterError::ScopeRequiresPairs);
    }
    let key_labels = result.key_labels().to_vec();
    let metric_label = result.metric_label().to_string();
    let mut rows = result.into_rows();
    match scope {
        Scope::Global => {
            rows.sort_by(by_rank);
            rows.truncate(n);
        }
        Scope::PerPrimaryKey => {
            let mut groups: BTreeMap<Value, Vec<(GroupKey, MetricValue)>> = BTreeMap::new();
            for row in rows {
                groups.entry(row.0.primary().clone()).or_default().push(row);
            }
            rows = groups
                .into_values()
                .flat_map(|mut group| {
                    group.sort_by(by_rank);
                    group.truncate(n);
                    group
                })
                .collect();
        }
    }
    Ok(Aggregation::new(key_labels, metric_label, rows))
}

/// Keep every (primary, secondary) row of the `n` primaries with the largest
/// total metric across their secondaries.
///
/// Output is ordered by the primaries' rank, then secondary key ascending. This
/// is the "top N labels, broken down by edition" shape of the frequency views.
pub fn top_n_stacked(result: Aggregation, n: usize) -> Result<Aggregation, InvalidParameterError> {
    check_top_n(n)?;
    if !result.is_paired() {
        return Err(InvalidParameterError::ScopeRequiresPairs);
    }
    let mut totals: BTreeMap<Value, MetricValue> = BTreeMap::new();
    for (key, metric) in result.rows() {
        totals
            .entry(key.primary().clone())
            .and_modify(|t| *t = t.add(*metric))
            .or_insert(*metric);
    }
    let mut ranked: Vec<(GroupKey, MetricValue)> = totals
        .into_iter()
        .map(|(k, total)| (GroupKey::Single(k), total))
        .collect();
    ranked.sort_by(by_rank);
    ranked.truncate(n);
    let position: BTreeMap<&Value, usize> = ranked
        .iter()
        .enumerate()
        .map(|(i, (k, _))| (k.primary(), i))
        .collect();

    let mut rows: Vec<(usize, GroupKey, MetricValue)> = result
        .rows()
        .iter()
        .filter_map(|(k, m)| position.get(k.primary()).map(|&i| (i, k.clone(), *m)))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    let rows = rows.into_iter().map(|(_, k, m)| (k, m)).collect();
    Ok(result.with_rows(rows))
}
