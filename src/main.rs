#![forbid(unsafe_code)]
//! # COP Dashboard CLI
//!
//! Command-line front end for the `cop_dashboard` crate. Each subcommand
//! loads one dataset, applies the language / COP filters and prints the
//! resulting table.
//!
//! ## Example
//! ```bash
//! cargo run --release -- authors --data data/combined_categorization.csv --lang en --cop 27 --top 5
//! ```
//!
//! See `--help` for all available options.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cop_dashboard::views::{self, distinct_posts};
use cop_dashboard::{
    AuthorScope, DataLoadError, DatasetKind, DatasetSpec, ExportFormat, FilterSelection,
    FrequencyKind, Metric, PipelineConfig, PipelineError, Table, dimension_options, export_table,
    load, render_text,
};
use log::{error, info};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Common {
    /// Data file of the dataset (repeat for datasets split over several files)
    #[arg(long = "data", value_name = "FILE")]
    data: Vec<PathBuf>,

    /// JSON file declaring datasets; used instead of --data
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset name inside --config (defaults to the command's dataset)
    #[arg(long)]
    dataset: Option<String>,

    /// Language to keep (repeatable; none keeps all languages)
    #[arg(long = "lang", value_name = "LANG")]
    langs: Vec<String>,

    /// COP edition to keep (repeatable; none keeps all editions)
    #[arg(long = "cop", value_name = "EDITION")]
    cops: Vec<String>,

    /// Also write the result table in this format (txt, csv, tsv, json)
    #[arg(long, value_enum)]
    export_format: Option<ExportFormat>,

    /// Directory for exported files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

impl Common {
    fn selection(&self) -> FilterSelection {
        FilterSelection::new()
            .languages(self.langs.iter().cloned())
            .select(cop_dashboard::config::EDITION, self.cops.iter().cloned())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AuthorMetric {
    /// Distinct posts (a post with several categories counts once)
    Distinct,
    /// Raw rows
    Rows,
}

#[derive(Subcommand)]
enum Command {
    /// Post, author and category counts for the selection
    Summary {
        #[command(flatten)]
        common: Common,
    },
    /// Most active authors, overall, in one category or per category
    Authors {
        #[command(flatten)]
        common: Common,
        /// Number of authors to show
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=30))]
        top: u64,
        /// Restrict the ranking to one category
        #[arg(long, conflicts_with = "per_category")]
        category: Option<String>,
        /// Rank authors separately inside each category
        #[arg(long, default_value_t = false)]
        per_category: bool,
        #[arg(long, value_enum, default_value_t = AuthorMetric::Distinct)]
        metric: AuthorMetric,
    },
    /// Most frequently cited web domains
    Domains {
        #[command(flatten)]
        common: Common,
        /// Number of domains to show
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=30))]
        top: u64,
    },
    /// Posts per category
    Categories {
        #[command(flatten)]
        common: Common,
        /// Read the most-active-users categorization file layout
        #[arg(long, default_value_t = false)]
        most_active_users: bool,
    },
    /// Posts per day and category for each COP edition (language filter only)
    Timeline {
        #[command(flatten)]
        common: Common,
        /// Read the most-active-users file and chart one series over the
        /// full language and COP selection
        #[arg(long, default_value_t = false)]
        most_active_users: bool,
    },
    /// Most frequent entities, words, verbs or hashtags, broken down by COP
    Frequencies {
        #[command(flatten)]
        common: Common,
        #[arg(long, value_enum)]
        kind: FrequencyKind,
        /// Number of labels to show
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=30))]
        top: u64,
    },
    /// Values available for a filter dimension
    Options {
        #[command(flatten)]
        common: Common,
        /// Dimension to list (e.g. language, cop_edition)
        #[arg(long, default_value = "language")]
        dimension: String,
        /// Preset layout of the data file
        #[arg(long, value_enum, default_value_t = DatasetKind::Categorization)]
        preset: DatasetKind,
    },
}

/// Resolve the dataset declaration: a named entry of --config, or the preset
/// layout applied to the --data files.
fn dataset_spec(common: &Common, kind: DatasetKind) -> Result<DatasetSpec, DataLoadError> {
    match &common.config {
        Some(path) => {
            let config = PipelineConfig::from_json_file(path)?;
            let name = common.dataset.as_deref().unwrap_or(kind.name());
            config.dataset(name).cloned().ok_or_else(|| {
                DataLoadError::Config(format!("no dataset '{name}' in {}", path.display()))
            })
        }
        None if common.data.is_empty() => Err(DataLoadError::NoSources(kind.name().to_string())),
        None => Ok(DatasetSpec::preset(kind, common.data.clone())),
    }
}

fn categorization(most_active_users: bool) -> DatasetKind {
    if most_active_users {
        DatasetKind::MostActiveUsers
    } else {
        DatasetKind::Categorization
    }
}

fn run(command: &Command) -> Result<(), PipelineError> {
    let (common, kind, table_name, table) = match command {
        Command::Summary { common } => {
            let ds = load(&dataset_spec(common, DatasetKind::Categorization)?)?;
            let summary = views::summary(&ds, &common.selection())?;
            (common, DatasetKind::Categorization, "summary", summary.to_table())
        }
        Command::Authors {
            common,
            top,
            category,
            per_category,
            metric,
        } => {
            let ds = load(&dataset_spec(common, DatasetKind::Categorization)?)?;
            let scope = match (category, per_category) {
                (Some(c), _) => AuthorScope::Category(c.clone()),
                (None, true) => AuthorScope::PerCategory,
                (None, false) => AuthorScope::AllCategories,
            };
            let metric = match metric {
                AuthorMetric::Distinct => distinct_posts(&ds),
                AuthorMetric::Rows => Metric::CountRows,
            };
            let table =
                views::top_authors(&ds, &common.selection(), &scope, *top as usize, &metric)?;
            (common, DatasetKind::Categorization, "top_authors", table)
        }
        Command::Domains { common, top } => {
            let ds = load(&dataset_spec(common, DatasetKind::Weblinks)?)?;
            let table = views::top_domains(&ds, &common.selection(), *top as usize)?;
            (common, DatasetKind::Weblinks, "top_domains", table)
        }
        Command::Categories {
            common,
            most_active_users,
        } => {
            let kind = categorization(*most_active_users);
            let ds = load(&dataset_spec(common, kind)?)?;
            let table = views::category_distribution(&ds, &common.selection())?;
            (common, kind, "categories", table)
        }
        Command::Timeline {
            common,
            most_active_users,
        } => {
            let kind = categorization(*most_active_users);
            let ds = load(&dataset_spec(common, kind)?)?;
            let table = if *most_active_users {
                views::category_evolution(&ds, &common.selection())?
            } else {
                views::category_timeline(&ds, &common.selection())?
            };
            (common, kind, "timeline", table)
        }
        Command::Frequencies { common, kind, top } => {
            let dataset_kind = kind.dataset_kind();
            let ds = load(&dataset_spec(common, dataset_kind)?)?;
            let table = views::frequency_ranking(&ds, &common.selection(), *kind, *top as usize)?;
            (common, dataset_kind, "frequencies", table)
        }
        Command::Options {
            common,
            dimension,
            preset,
        } => {
            let kind = *preset;
            let ds = load(&dataset_spec(common, kind)?)?;
            let mut table = Table::new(
                format!("Options for {dimension}"),
                vec![dimension.clone()],
            );
            table.rows = dimension_options(&ds, dimension)?
                .into_iter()
                .map(|v| vec![v])
                .collect();
            (common, kind, "options", table)
        }
    };

    println!("{}", render_text(&table));

    if let Some(format) = common.export_format {
        let path = export_table(&table, &common.out_dir, kind.name(), table_name, format)
            .map_err(|source| PipelineError::Export {
                path: common.out_dir.clone(),
                source,
            })?;
        info!("wrote {}", path.display());
        println!("Exported to {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli.command) {
        Ok(()) => {}
        Err(PipelineError::DataLoad(e)) => {
            error!("No data available: {}", e);
            process::exit(1);
        }
        Err(e) => {
            error!("Error: {}", e);
            process::exit(1);
        }
    }
}
