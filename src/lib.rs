#![forbid(unsafe_code)]
//! # cop_dashboard
//!
//! Filter, aggregate and rank pipeline over social-media posts about the COP
//! climate conferences.
//!
//! A pass always has the same shape:
//!
//! 1. [`load`] a [`Dataset`] once, from a [`DatasetSpec`] (a preset for one of
//!    the corpus files, or a JSON [`PipelineConfig`]);
//! 2. narrow it with a [`FilterSelection`] on `language` / `cop_edition`;
//! 3. [`aggregate`] by one or two keys;
//! 4. [`rank_and_truncate`] to the top N, overall or within each primary key.
//!
//! The [`views`] module packages those steps into the tables a dashboard shows.
//!
//! ## Example
//! ```
//! use cop_dashboard::{
//!     ColumnType, Dataset, FilterSelection, Metric, Scope, Value, aggregate, filter,
//!     rank_and_truncate,
//! };
//!
//! let ds = Dataset::from_rows(
//!     "posts",
//!     &[
//!         ("id", ColumnType::Number),
//!         ("language", ColumnType::Category),
//!         ("cop_edition", ColumnType::Number),
//!         ("author", ColumnType::Category),
//!     ],
//!     "id",
//!     vec![
//!         vec![Value::from(1i64), "en".into(), 27.0.into(), "zeta".into()],
//!         vec![Value::from(2i64), "en".into(), 27.0.into(), "alpha".into()],
//!         vec![Value::from(3i64), "fr".into(), 26.0.into(), "zeta".into()],
//!     ],
//! )
//! .unwrap();
//!
//! let en = filter(&ds, &FilterSelection::new().languages(["en"])).unwrap();
//! let counts = aggregate(&en, &["author".into()], &Metric::CountRows).unwrap();
//! let top = rank_and_truncate(counts, 2, Scope::Global).unwrap();
//! let authors: Vec<String> = top.rows().iter().map(|(k, _)| k.primary().to_string()).collect();
//! assert_eq!(authors, vec!["alpha", "zeta"]);
//! ```

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod rank;
pub mod views;

pub use aggregate::{
    Aggregation, GroupKey, KeyExpr, Metric, MetricValue, aggregate, explode_and_count,
};
pub use config::{ColumnType, DatasetKind, DatasetSpec, PipelineConfig};
pub use dataset::{Dataset, Record, Schema, Value};
pub use error::{DataLoadError, InvalidParameterError, PipelineError};
pub use export::{ExportFormat, csv_safe_cell, export_table, render_text};
pub use filter::{FilterSelection, dimension_options, filter};
pub use loader::{load, load_all};
pub use rank::{Scope, rank_and_truncate, top_n_stacked};
pub use views::{AuthorScope, FrequencyKind, Summary, Table};
