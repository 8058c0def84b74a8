//! Error types shared by the loader, the filter and the aggregation stages.

use std::path::PathBuf;

use thiserror::Error;

/// A dataset could not be loaded. Fatal for the view that needed it.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed delimited data in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("'{}' has no column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("dataset '{0}' declares no source files")]
    NoSources(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// A caller passed parameters the pipeline cannot honour. Rejected before any
/// computation happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParameterError {
    #[error("top-N must be a positive integer")]
    NonPositiveTopN,
    #[error("grouping takes one or two keys, got {0}")]
    GroupArity(usize),
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("per-primary-key ranking needs a two-key aggregation")]
    ScopeRequiresPairs,
    #[error("delimiter must not be empty")]
    EmptyDelimiter,
}

/// Any failure of a filter-aggregate-rank pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameterError),
    #[error("cannot export to '{}': {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
