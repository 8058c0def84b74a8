//! Dataset declarations: where a dataset lives, how its files are delimited and
//! how source headers map onto the canonical column names the pipeline uses.
//!
//! A [`DatasetSpec`] can be built from a [`DatasetKind`] preset or read from a
//! JSON [`PipelineConfig`] file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DataLoadError;

pub const LANGUAGE: &str = "language";
pub const EDITION: &str = "cop_edition";
pub const ID: &str = "id";
pub const AUTHOR: &str = "author";
pub const CATEGORY: &str = "category";
pub const DOMAINS: &str = "domains";
pub const CREATED_AT: &str = "created_at";
pub const FREQUENCY: &str = "frequency";
pub const ENTITY: &str = "entity";
pub const WORD: &str = "word";
pub const VERB: &str = "verb";
pub const HASHTAG: &str = "hashtag";

/// Sentinel for missing languages.
pub const UNKNOWN_LANGUAGE: &str = "unknown";
/// Sentinel for missing authors and other categorical columns.
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for posts without a category label.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Storage type of a column after load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Free text; missing cells stay missing.
    Text,
    /// Numeric; unparseable cells become missing.
    Number,
    /// Categorical label; missing cells get the column sentinel.
    Category,
    /// Timestamp-like string, kept verbatim.
    Timestamp,
}

/// The known files of the COP corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Categorization,
    MostActiveUsers,
    Weblinks,
    Entities,
    Words,
    Verbs,
    Hashtags,
}

impl DatasetKind {
    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Categorization => "categorization",
            DatasetKind::MostActiveUsers => "most_active_users",
            DatasetKind::Weblinks => "weblinks",
            DatasetKind::Entities => "entities",
            DatasetKind::Words => "words",
            DatasetKind::Verbs => "verbs",
            DatasetKind::Hashtags => "hashtags",
        }
    }
}

/// Declares one dataset: its files and its schema mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub paths: Vec<PathBuf>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Source header -> canonical column name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Canonical name of the unique row identifier. `None` numbers rows in
    /// load order instead.
    #[serde(default)]
    pub id_column: Option<String>,
    /// Canonical column name -> type. Undeclared columns load as text.
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnType>,
    /// Canonical column name -> fill value for missing cells.
    #[serde(default)]
    pub sentinels: BTreeMap<String, String>,
}

fn default_delimiter() -> char {
    ','
}

impl DatasetSpec {
    /// Empty declaration with the two dimension columns typed.
    pub fn new(name: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        let mut columns = BTreeMap::new();
        columns.insert(LANGUAGE.to_string(), ColumnType::Category);
        columns.insert(EDITION.to_string(), ColumnType::Number);
        Self {
            name: name.into(),
            paths,
            delimiter: default_delimiter(),
            aliases: BTreeMap::new(),
            id_column: None,
            columns,
            sentinels: BTreeMap::new(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_alias(mut self, source: &str, canonical: &str) -> Self {
        self.aliases.insert(source.to_string(), canonical.to_string());
        self
    }

    pub fn with_id(mut self, column: &str) -> Self {
        self.id_column = Some(column.to_string());
        self
    }

    pub fn with_column(mut self, column: &str, ty: ColumnType) -> Self {
        self.columns.insert(column.to_string(), ty);
        self
    }

    pub fn with_sentinel(mut self, column: &str, fill: &str) -> Self {
        self.sentinels.insert(column.to_string(), fill.to_string());
        self
    }

    /// Schema of one of the known corpus files.
    pub fn preset(kind: DatasetKind, paths: Vec<PathBuf>) -> Self {
        let base = DatasetSpec::new(kind.name(), paths)
            .with_alias("lang", LANGUAGE)
            .with_alias("cop", EDITION)
            .with_sentinel(LANGUAGE, UNKNOWN_LANGUAGE);
        match kind {
            DatasetKind::Categorization | DatasetKind::MostActiveUsers => base
                .with_delimiter(';')
                .with_alias("author.userName", AUTHOR)
                .with_alias("categories", CATEGORY)
                .with_alias("createdAt", CREATED_AT)
                .with_id(ID)
                .with_column(AUTHOR, ColumnType::Category)
                .with_column(CATEGORY, ColumnType::Category)
                .with_column(CREATED_AT, ColumnType::Timestamp)
                .with_sentinel(AUTHOR, UNKNOWN)
                .with_sentinel(CATEGORY, UNCATEGORIZED),
            DatasetKind::Weblinks => base
                .with_alias("extracted_domains", DOMAINS)
                .with_column(DOMAINS, ColumnType::Text),
            DatasetKind::Entities => frequency_table(base, ENTITY),
            DatasetKind::Words => frequency_table(base, WORD),
            DatasetKind::Verbs => frequency_table(base, VERB),
            DatasetKind::Hashtags => frequency_table(base, HASHTAG),
        }
    }

    /// Declared type of a canonical column.
    pub fn column_type(&self, column: &str) -> ColumnType {
        match (column, self.columns.get(column)) {
            (EDITION, _) => ColumnType::Number,
            (_, Some(ty)) => *ty,
            (LANGUAGE, None) => ColumnType::Category,
            (_, None) => ColumnType::Text,
        }
    }

    /// Fill value for missing cells of `column`, if it has one.
    pub fn sentinel(&self, column: &str) -> Option<&str> {
        if let Some(fill) = self.sentinels.get(column) {
            return Some(fill);
        }
        match self.column_type(column) {
            ColumnType::Category if column == LANGUAGE => Some(UNKNOWN_LANGUAGE),
            ColumnType::Category => Some(UNKNOWN),
            _ => None,
        }
    }

    /// Canonical name for a source header.
    pub fn canonical<'a>(&'a self, header: &'a str) -> &'a str {
        self.aliases
            .get(header.trim())
            .map(String::as_str)
            .unwrap_or_else(|| header.trim())
    }

    /// Delimiter as the single byte the csv reader expects.
    pub fn delimiter_byte(&self) -> Result<u8, DataLoadError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(DataLoadError::Config(format!(
                "dataset '{}': delimiter {:?} is not a single-byte character",
                self.name, self.delimiter
            )))
        }
    }
}

fn frequency_table(base: DatasetSpec, label: &str) -> DatasetSpec {
    base.with_delimiter(';')
        .with_column(label, ColumnType::Text)
        .with_column(FREQUENCY, ColumnType::Number)
}

/// A set of dataset declarations, usually read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub datasets: Vec<DatasetSpec>,
}

impl PipelineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, DataLoadError> {
        serde_json::from_str(s).map_err(|e| DataLoadError::Config(e.to_string()))
    }

    /// Read a JSON config. Relative dataset paths resolve against the
    /// directory holding the config file.
    pub fn from_json_file(path: &Path) -> Result<Self, DataLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| DataLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&raw)?;
        if let Some(base) = path.parent() {
            for spec in &mut config.datasets {
                for p in &mut spec.paths {
                    if p.is_relative() {
                        *p = base.join(&*p);
                    }
                }
            }
        }
        Ok(config)
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| d.name == name)
    }
}
