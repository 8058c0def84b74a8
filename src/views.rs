//! The dashboard views, each expressed as filter -> aggregate -> rank over a
//! loaded dataset.
//!
//! Every view takes the caller's [`FilterSelection`] explicitly and returns a
//! [`Table`]. An empty table is a normal outcome and should be shown as
//! "no data for this selection", not treated as a failure.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    Aggregation, GroupKey, KeyExpr, Metric, MetricValue, aggregate, explode_and_count,
};
use crate::config::{
    AUTHOR, CATEGORY, CREATED_AT, DOMAINS, DatasetKind, EDITION, ENTITY, FREQUENCY, HASHTAG,
    LANGUAGE, VERB, WORD,
};
use crate::dataset::{Dataset, Value};
use crate::error::InvalidParameterError;
use crate::filter::{FilterSelection, dimension_options, filter};
use crate::rank::{Scope, check_top_n, rank_and_truncate, top_n_stacked};

/// A rendered result: headers plus rows of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(title: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            title: title.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// One row per group: key columns followed by the metric.
    pub fn from_aggregation(title: impl Into<String>, agg: &Aggregation) -> Self {
        let mut headers = agg.key_labels().to_vec();
        headers.push(agg.metric_label().to_string());
        let rows = agg
            .rows()
            .iter()
            .map(|(k, m)| {
                let mut row = k.values();
                row.push((*m).into());
                row
            })
            .collect();
        Self {
            title: title.into(),
            headers,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Drop one column by header name, if present.
    fn without_column(mut self, header: &str) -> Self {
        if let Some(i) = self.headers.iter().position(|h| h == header) {
            self.headers.remove(i);
            for row in &mut self.rows {
                row.remove(i);
            }
        }
        self
    }
}

/// Headline numbers for a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub distinct_posts: usize,
    pub distinct_authors: Option<usize>,
    pub distinct_categories: Option<usize>,
}

impl Summary {
    pub fn to_table(&self) -> Table {
        let mut table = Table::new("Summary", vec!["measure".into(), "value".into()]);
        let mut push = |name: &str, v: usize| {
            table.rows.push(vec![Value::from(name), Value::from(v as u64)]);
        };
        push("rows", self.rows);
        push("distinct posts", self.distinct_posts);
        if let Some(n) = self.distinct_authors {
            push("distinct authors", n);
        }
        if let Some(n) = self.distinct_categories {
            push("distinct categories", n);
        }
        table
    }
}

/// Row count and distinct counts of the filtered dataset. Author and category
/// counts are `None` when the dataset has no such column.
pub fn summary(
    dataset: &Dataset,
    selection: &FilterSelection,
) -> Result<Summary, InvalidParameterError> {
    let filtered = filter(dataset, selection)?;
    let optional = |column: &str| {
        if filtered.has_column(column) {
            filtered.count_distinct(column).map(Some)
        } else {
            Ok(None)
        }
    };
    Ok(Summary {
        rows: filtered.len(),
        distinct_posts: filtered.count_distinct(filtered.id_column())?,
        distinct_authors: optional(AUTHOR)?,
        distinct_categories: optional(CATEGORY)?,
    })
}

/// Which authors ranking to compute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorScope {
    /// Top authors over all categories together.
    AllCategories,
    /// Top authors inside one category.
    Category(String),
    /// Top authors inside each category, grouped by category.
    PerCategory,
}

/// Default metric for author rankings: distinct posts, so a post carrying
/// several category labels counts once.
pub fn distinct_posts(dataset: &Dataset) -> Metric {
    Metric::CountDistinct(dataset.id_column().to_string())
}

/// Most active authors for the selection.
pub fn top_authors(
    dataset: &Dataset,
    selection: &FilterSelection,
    scope: &AuthorScope,
    n: usize,
    metric: &Metric,
) -> Result<Table, InvalidParameterError> {
    check_top_n(n)?;
    let filtered = filter(dataset, selection)?;
    match scope {
        AuthorScope::AllCategories => {
            let agg = aggregate(&filtered, &[AUTHOR.into()], metric)?;
            let ranked = rank_and_truncate(agg, n, Scope::Global)?;
            Ok(Table::from_aggregation("Top authors", &ranked))
        }
        AuthorScope::Category(category) => {
            let ranked = per_category_authors(&filtered, n, metric)?;
            let rows = ranked
                .rows()
                .iter()
                .filter(|(k, _)| k.primary().as_str() == Some(category.as_str()))
                .cloned()
                .collect();
            let table = Table::from_aggregation(
                format!("Top authors in {category}"),
                &ranked_with(&ranked, rows),
            );
            Ok(table.without_column(CATEGORY))
        }
        AuthorScope::PerCategory => {
            let ranked = per_category_authors(&filtered, n, metric)?;
            Ok(Table::from_aggregation("Top authors per category", &ranked))
        }
    }
}

fn per_category_authors(
    filtered: &Dataset,
    n: usize,
    metric: &Metric,
) -> Result<Aggregation, InvalidParameterError> {
    let agg = aggregate(filtered, &[CATEGORY.into(), AUTHOR.into()], metric)?;
    rank_and_truncate(agg, n, Scope::PerPrimaryKey)
}

fn ranked_with(
    agg: &Aggregation,
    rows: Vec<(GroupKey, MetricValue)>,
) -> Aggregation {
    Aggregation::new(agg.key_labels().to_vec(), agg.metric_label(), rows)
}

/// Most cited web domains; cells of the domain column hold comma-separated
/// lists.
pub fn top_domains(
    dataset: &Dataset,
    selection: &FilterSelection,
    n: usize,
) -> Result<Table, InvalidParameterError> {
    check_top_n(n)?;
    let filtered = filter(dataset, selection)?;
    let agg = explode_and_count(&filtered, DOMAINS, ",")?;
    let ranked = rank_and_truncate(agg, n, Scope::Global)?;
    Ok(Table::from_aggregation("Most frequent web domains", &ranked))
}

/// Rows per category, most frequent first.
pub fn category_distribution(
    dataset: &Dataset,
    selection: &FilterSelection,
) -> Result<Table, InvalidParameterError> {
    let filtered = filter(dataset, selection)?;
    let agg = aggregate(&filtered, &[CATEGORY.into()], &Metric::CountRows)?;
    let n = agg.len().max(1);
    let ranked = rank_and_truncate(agg, n, Scope::Global)?;
    Ok(Table::from_aggregation("Categories distribution", &ranked))
}

/// Posts per day and category, split by edition.
///
/// Only the language part of the selection applies: each edition gets its
/// own series regardless of which editions are selected. Editions appear in
/// ascending order, and within one edition rows are ordered by day then
/// category. Rows without a numeric edition are left out.
pub fn category_timeline(
    dataset: &Dataset,
    selection: &FilterSelection,
) -> Result<Table, InvalidParameterError> {
    let by_language = filter(dataset, &selection.only(&[LANGUAGE]))?;
    let mut table = Table::new(
        "Chronological evolution of posts per category",
        vec![
            EDITION.to_string(),
            KeyExpr::Day(CREATED_AT.into()).label(),
            CATEGORY.to_string(),
            Metric::CountRows.label(),
        ],
    );
    for edition in dimension_options(&by_language, EDITION)? {
        let one = filter(
            &by_language,
            &FilterSelection::new().select(EDITION, [edition.clone()]),
        )?;
        let agg = aggregate(
            &one,
            &[KeyExpr::Day(CREATED_AT.into()), CATEGORY.into()],
            &Metric::CountRows,
        )?;
        for (key, count) in agg.rows() {
            let mut row = vec![edition.clone()];
            row.extend(key.values());
            row.push((*count).into());
            table.rows.push(row);
        }
    }
    Ok(table)
}

/// Posts per day and category over the whole selection, languages and
/// editions alike, as one series. Rows are ordered by day then category.
pub fn category_evolution(
    dataset: &Dataset,
    selection: &FilterSelection,
) -> Result<Table, InvalidParameterError> {
    let filtered = filter(dataset, selection)?;
    let agg = aggregate(
        &filtered,
        &[KeyExpr::Day(CREATED_AT.into()), CATEGORY.into()],
        &Metric::CountRows,
    )?;
    Ok(Table::from_aggregation(
        "Chronological evolution of posts per category",
        &agg,
    ))
}

/// The four pre-computed frequency tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyKind {
    Entities,
    Words,
    Verbs,
    Hashtags,
}

impl FrequencyKind {
    pub fn dataset_kind(self) -> DatasetKind {
        match self {
            FrequencyKind::Entities => DatasetKind::Entities,
            FrequencyKind::Words => DatasetKind::Words,
            FrequencyKind::Verbs => DatasetKind::Verbs,
            FrequencyKind::Hashtags => DatasetKind::Hashtags,
        }
    }

    /// Key the ranking groups on. Entity labels lose their type tag.
    pub fn key(self) -> KeyExpr {
        match self {
            FrequencyKind::Entities => KeyExpr::EntityLabel(ENTITY.into()),
            FrequencyKind::Words => WORD.into(),
            FrequencyKind::Verbs => VERB.into(),
            FrequencyKind::Hashtags => HASHTAG.into(),
        }
    }

    fn title(self) -> &'static str {
        match self {
            FrequencyKind::Entities => "Most frequent entities",
            FrequencyKind::Words => "Most frequent words",
            FrequencyKind::Verbs => "Most frequent verbs",
            FrequencyKind::Hashtags => "Most frequent hashtags",
        }
    }
}

/// Top `n` labels by total frequency, broken down by edition.
pub fn frequency_ranking(
    dataset: &Dataset,
    selection: &FilterSelection,
    kind: FrequencyKind,
    n: usize,
) -> Result<Table, InvalidParameterError> {
    check_top_n(n)?;
    let filtered = filter(dataset, selection)?;
    let agg = aggregate(
        &filtered,
        &[kind.key(), EDITION.into()],
        &Metric::Sum(FREQUENCY.into()),
    )?;
    let stacked = top_n_stacked(agg, n)?;
    Ok(Table::from_aggregation(kind.title(), &stacked))
}
