//! Integration tests for `cop_dashboard`.
//
// This suite verifies:
// - Loading and normalisation of the corpus file layouts (sentinels, numeric editions)
// - Views over a loaded dataset (authors, domains, categories, timeline, frequencies)
// - CLI behavior including filters, export formats and failure modes
//
// Notes:
// - CLI tests run the binary with a per-process working directory and export
//   into an explicit --out-dir, so no test touches the global CWD.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use regex::Regex;
use serde_json::Value as Json;

use cop_dashboard::views::{self, distinct_posts};
use cop_dashboard::{
    AuthorScope, DataLoadError, DatasetKind, DatasetSpec, FilterSelection, FrequencyKind, Metric,
    PipelineConfig, Table, Value, csv_safe_cell, dimension_options, filter, load,
};

const CATEGORIZATION: &str = "\
id;lang;cop;author.userName;categories;createdAt
1;en;27;alice;Policy;2022-11-08 10:00:00
1;en;27;alice;Activism;2022-11-08 10:00:00
2;en;27;bob;Policy;2022-11-09 09:00:00
3;fr;27;claire;Policy;2022-11-09 12:00:00
4;en;26;bob;;2021-11-01 08:00:00
5;;28;;Science;2023-12-01 08:00:00
6;en;n/a;dave;Policy;2022-11-10 08:00:00
";

const WEBLINKS: &str = "\
lang,cop,extracted_domains
en,27,\"un.org, bbc.co.uk\"
en,27,un.org
fr,27,\"lemonde.fr,,un.org\"
en,26,
";

const ENTITIES: &str = "\
entity;frequency;cop;lang
boris johnson (PER);5;26;en
boris johnson (PER);2;27;en
greta (PER);4;27;en
un (ORG);1;27;fr
";

// --------------------- helpers ---------------------

/// Create a file with content in a temp dir.
fn write_file(dir: &assert_fs::TempDir, name: &str, content: &str) -> PathBuf {
    let f = dir.child(name);
    f.write_str(content).unwrap();
    f.path().to_path_buf()
}

/// Load a preset dataset from a single file.
fn load_preset(kind: DatasetKind, path: &Path) -> cop_dashboard::Dataset {
    load(&DatasetSpec::preset(kind, vec![path.to_path_buf()])).unwrap()
}

/// Table cells as strings, row by row.
fn cells(table: &Table) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|r| r.iter().map(Value::to_string).collect())
        .collect()
}

/// Run CLI successfully with a specific working directory.
fn run_cli_ok_in(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::Command::cargo_bin("cop_dashboard").unwrap();
    cmd.current_dir(dir);
    cmd.args(args).assert().success()
}

/// Run CLI expecting failure with a specific working directory.
fn run_cli_fail_in(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::Command::cargo_bin("cop_dashboard").unwrap();
    cmd.current_dir(dir);
    cmd.env("RUST_LOG", "error");
    cmd.args(args).assert().failure()
}

/// Find the single exported file whose name ends with `suffix`.
fn find_export_with_suffix(dir: &Path, suffix: &str) -> PathBuf {
    for entry in fs::read_dir(dir).unwrap().filter_map(|e| e.ok()) {
        let p = entry.path();
        if let Some(name) = p.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(suffix) {
                return p;
            }
        }
    }
    panic!("No export found ending with {}", suffix);
}

// --------------------- library tests ---------------------

#[test]
fn lib_load_applies_sentinels_and_numeric_editions() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = write_file(&tmp, "cat.csv", CATEGORIZATION);
    let ds = load_preset(DatasetKind::Categorization, &path);

    assert_eq!(ds.len(), 7);
    assert_eq!(
        dimension_options(&ds, "language").unwrap(),
        vec![Value::from("en"), Value::from("fr"), Value::from("unknown")]
    );
    // "n/a" is coerced to missing and never offered as an option
    assert_eq!(
        dimension_options(&ds, "cop_edition").unwrap(),
        vec![Value::from(26.0), Value::from(27.0), Value::from(28.0)]
    );
    let authors: Vec<&Value> = ds.column("author").unwrap().collect();
    assert!(authors.contains(&&Value::from("Unknown")));
    let categories: Vec<&Value> = ds.column("category").unwrap().collect();
    assert!(categories.contains(&&Value::from("Uncategorized")));
}

#[test]
fn lib_missing_file_is_a_load_error() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let spec = DatasetSpec::preset(DatasetKind::Categorization, vec![tmp.path().join("nope.csv")]);
    assert!(matches!(load(&spec), Err(DataLoadError::Io { .. })));
}

#[test]
fn lib_missing_dimension_column_is_a_load_error() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = write_file(&tmp, "cat.csv", "id;author.userName\n1;alice\n");
    let spec = DatasetSpec::preset(DatasetKind::Categorization, vec![path]);
    match load(&spec) {
        Err(DataLoadError::MissingColumn { column, .. }) => assert_eq!(column, "language"),
        other => panic!("expected MissingColumn, got {:?}", other),
    }
}

#[test]
fn lib_multi_part_dataset_concatenates_in_order() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let a = write_file(&tmp, "a.csv", "entity;frequency;cop;lang\ngreta (PER);1;26;en\n");
    let b = write_file(&tmp, "b.csv", "entity;frequency;cop;lang\ngreta (PER);2;27;en\n");
    let ds = load(&DatasetSpec::preset(DatasetKind::Entities, vec![a, b])).unwrap();
    let freqs: Vec<&Value> = ds.column("frequency").unwrap().collect();
    assert_eq!(freqs, vec![&Value::from(1.0), &Value::from(2.0)]);
}

#[test]
fn lib_filter_combines_language_and_edition() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = write_file(&tmp, "cat.csv", CATEGORIZATION);
    let ds = load_preset(DatasetKind::Categorization, &path);

    let sel = FilterSelection::new().languages(["en"]).editions([27.0]);
    let out = filter(&ds, &sel).unwrap();
    assert_eq!(out.len(), 3);

    // editions given as text are coerced like the loader does
    let sel = FilterSelection::new().select("cop_edition", ["27"]);
    assert_eq!(filter(&ds, &sel).unwrap().len(), 4);

    let nothing = FilterSelection::new().languages(["de"]);
    assert!(filter(&ds, &nothing).unwrap().is_empty());
    assert_eq!(ds.len(), 7);
}

#[test]
fn lib_top_authors_counts_distinct_posts_by_default() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = write_file(&tmp, "cat.csv", CATEGORIZATION);
    let ds = load_preset(DatasetKind::Categorization, &path);
    let sel = FilterSelection::new().languages(["en"]);

    let table = views::top_authors(
        &ds,
        &sel,
        &AuthorScope::AllCategories,
        10,
        &distinct_posts(&ds),
    )
    .unwrap();
    assert_eq!(table.headers, vec!["author", "distinct_id"]);
    assert_eq!(
        cells(&table),
        vec![vec!["bob", "2"], vec!["alice", "1"], vec!["dave", "1"]]
    );

    let rows = views::top_authors(&ds, &sel, &AuthorScope::AllCategories, 10, &Metric::CountRows)
        .unwrap();
    assert_eq!(
        cells(&rows),
        vec![vec!["alice", "2"], vec!["bob", "2"], vec!["dave", "1"]]
    );
}

#[test]
fn lib_top_authors_per_category_and_single_category() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = write_file(&tmp, "cat.csv", CATEGORIZATION);
    let ds = load_preset(DatasetKind::Categorization, &path);
    let all = FilterSelection::new();
    let metric = distinct_posts(&ds);

    let per = views::top_authors(&ds, &all, &AuthorScope::PerCategory, 1, &metric).unwrap();
    assert_eq!(
        cells(&per),
        vec![
            vec!["Activism", "alice", "1"],
            vec!["Policy", "alice", "1"],
            vec!["Science", "Unknown", "1"],
            vec!["Uncategorized", "bob", "1"],
        ]
    );

    let policy = views::top_authors(
        &ds,
        &all,
        &AuthorScope::Category("Policy".into()),
        2,
        &metric,
    )
    .unwrap();
    assert_eq!(policy.headers, vec!["author", "distinct_id"]);
    assert_eq!(cells(&policy), vec![vec!["alice", "1"], vec!["bob", "1"]]);
}

#[test]
fn lib_summary_counts_posts_authors_and_categories() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = write_file(&tmp, "cat.csv", CATEGORIZATION);
    let ds = load_preset(DatasetKind::Categorization, &path);

    let s = views::summary(&ds, &FilterSelection::new()).unwrap();
    assert_eq!(s.rows, 7);
    assert_eq!(s.distinct_posts, 6);
    assert_eq!(s.distinct_authors, Some(5));
    assert_eq!(s.distinct_categories, Some(4));
}

#[test]
fn lib_timeline_ignores_edition_selection() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = write_file(&tmp, "cat.csv", CATEGORIZATION);
    let ds = load_preset(DatasetKind::Categorization, &path);
    let sel = FilterSelection::new().languages(["en"]).editions([27.0]);

    let table = views::category_timeline(&ds, &sel).unwrap();
    assert_eq!(table.headers, vec!["cop_edition", "day", "category", "count"]);
    assert_eq!(
        cells(&table),
        vec![
            vec!["26", "2021-11-01", "Uncategorized", "1"],
            vec!["27", "2022-11-08", "Activism", "1"],
            vec!["27", "2022-11-08", "Policy", "1"],
            vec!["27", "2022-11-09", "Policy", "1"],
        ]
    );
}

#[test]
fn lib_top_domains_explodes_lists() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = write_file(&tmp, "links.csv", WEBLINKS);
    let ds = load_preset(DatasetKind::Weblinks, &path);

    let all = views::top_domains(&ds, &FilterSelection::new(), 10).unwrap();
    assert_eq!(
        cells(&all),
        vec![
            vec!["un.org", "3"],
            vec!["bbc.co.uk", "1"],
            vec!["lemonde.fr", "1"],
        ]
    );

    let en = views::top_domains(&ds, &FilterSelection::new().languages(["en"]), 1).unwrap();
    assert_eq!(cells(&en), vec![vec!["un.org", "2"]]);
}

#[test]
fn lib_entity_frequencies_strip_type_and_stack_by_edition() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = write_file(&tmp, "entities.csv", ENTITIES);
    let ds = load_preset(DatasetKind::Entities, &path);

    let table =
        views::frequency_ranking(&ds, &FilterSelection::new(), FrequencyKind::Entities, 1)
            .unwrap();
    assert_eq!(table.headers, vec!["entity_label", "cop_edition", "frequency"]);
    assert_eq!(
        cells(&table),
        vec![
            vec!["boris johnson", "26", "5"],
            vec!["boris johnson", "27", "2"],
        ]
    );
}

#[test]
fn lib_config_file_resolves_relative_paths() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "data/posts.csv", "language;cop_edition;user\nen;27;alice\n");
    let cfg = write_file(
        &tmp,
        "pipeline.json",
        r#"{"datasets": [{"name": "posts", "paths": ["data/posts.csv"], "delimiter": ";",
            "columns": {"user": "category"}}]}"#,
    );
    let config = PipelineConfig::from_json_file(&cfg).unwrap();
    let spec = config.dataset("posts").unwrap();
    let ds = load(spec).unwrap();
    assert_eq!(ds.len(), 1);
    assert_eq!(ds.id_column(), "row_id");
}

#[test]
fn lib_csv_safe_cell_guards_formulas() {
    assert_eq!(csv_safe_cell("=1+1".into()), "'=1+1");
    assert_eq!(csv_safe_cell("-3".into()), "'-3");
    assert_eq!(csv_safe_cell("un.org".into()), "un.org");
}

// --------------------- CLI tests ---------------------

#[test]
fn cli_missing_data_file_fails() {
    let tmp = assert_fs::TempDir::new().unwrap();
    run_cli_fail_in(tmp.path(), &["summary", "--data", "does_not_exist.csv"])
        .stderr(predicate::str::contains("No data available"));
}

#[test]
fn cli_without_sources_fails() {
    let tmp = assert_fs::TempDir::new().unwrap();
    run_cli_fail_in(tmp.path(), &["authors"]);
}

#[test]
fn cli_top_out_of_range_is_rejected() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "cat.csv", CATEGORIZATION);
    run_cli_fail_in(tmp.path(), &["authors", "--data", "cat.csv", "--top", "0"]);
    run_cli_fail_in(tmp.path(), &["authors", "--data", "cat.csv", "--top", "31"]);
}

#[test]
fn cli_authors_with_filters() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "cat.csv", CATEGORIZATION);
    run_cli_ok_in(
        tmp.path(),
        &[
            "authors", "--data", "cat.csv", "--lang", "en", "--cop", "27", "--top", "5",
        ],
    )
    .stdout(predicate::str::contains("Top authors:"))
    .stdout(predicate::str::contains("alice\t1"))
    .stdout(predicate::str::contains("bob\t1"))
    .stdout(predicate::str::contains("claire").not());
}

#[test]
fn cli_empty_selection_prints_no_data() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "cat.csv", CATEGORIZATION);
    run_cli_ok_in(
        tmp.path(),
        &["categories", "--data", "cat.csv", "--lang", "de"],
    )
    .stdout(predicate::str::contains("No data for this selection."));
}

#[test]
fn cli_unknown_dimension_fails() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "cat.csv", CATEGORIZATION);
    run_cli_fail_in(
        tmp.path(),
        &["options", "--data", "cat.csv", "--dimension", "nonexistent"],
    )
    .stderr(predicate::str::contains("nonexistent"));
}

#[test]
fn cli_options_lists_languages() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "cat.csv", CATEGORIZATION);
    run_cli_ok_in(tmp.path(), &["options", "--data", "cat.csv"])
        .stdout(predicate::str::contains("  en\n  fr\n  unknown\n"));
}

#[test]
fn cli_export_csv_names_and_sanitises() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(
        &tmp,
        "cat.csv",
        "id;lang;cop;author.userName;categories;createdAt\n1;en;27;=evil;Policy;2022-11-08\n",
    );
    let out = tmp.child("out");
    run_cli_ok_in(
        tmp.path(),
        &[
            "authors",
            "--data",
            "cat.csv",
            "--export-format",
            "csv",
            "--out-dir",
            out.path().to_str().unwrap(),
        ],
    )
    .stdout(predicate::str::contains("Exported to"));

    let p = find_export_with_suffix(out.path(), "_top_authors.csv");
    let re = Regex::new(r"categorization_\d{8}_\d{6}_top_authors\.csv$").unwrap();
    assert!(re.is_match(p.to_str().unwrap()), "unexpected name {:?}", p);
    let content = fs::read_to_string(p).unwrap();
    assert_eq!(content, "author,distinct_id\n'=evil,1\n");
}

#[test]
fn cli_export_json_frequencies() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "entities.csv", ENTITIES);
    let out = tmp.child("out");
    run_cli_ok_in(
        tmp.path(),
        &[
            "frequencies",
            "--kind",
            "entities",
            "--data",
            "entities.csv",
            "--top",
            "2",
            "--export-format",
            "json",
            "--out-dir",
            out.path().to_str().unwrap(),
        ],
    );

    let p = find_export_with_suffix(out.path(), "_frequencies.json");
    let v: Json = serde_json::from_str(&fs::read_to_string(p).unwrap()).unwrap();
    assert_eq!(v["title"], "Most frequent entities");
    let rows = v["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], "boris johnson");
    assert_eq!(rows[2][0], "greta");
    assert_eq!(rows[2][2], serde_json::json!(4));
}

#[test]
fn cli_export_tsv_domains() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "links.csv", WEBLINKS);
    let out = tmp.child("out");
    run_cli_ok_in(
        tmp.path(),
        &[
            "domains",
            "--data",
            "links.csv",
            "--export-format",
            "tsv",
            "--out-dir",
            out.path().to_str().unwrap(),
        ],
    );
    let p = find_export_with_suffix(out.path(), "_top_domains.tsv");
    let content = fs::read_to_string(p).unwrap();
    assert!(content.starts_with("domains\tcount\nun.org\t3\n"));
}

#[test]
fn cli_config_selects_named_dataset() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "cat.csv", CATEGORIZATION);
    let preset = DatasetSpec::preset(DatasetKind::Categorization, vec![PathBuf::from("cat.csv")]);
    let config = PipelineConfig {
        datasets: vec![DatasetSpec {
            name: "posts".into(),
            ..preset
        }],
    };
    write_file(
        &tmp,
        "pipeline.json",
        &serde_json::to_string(&config).unwrap(),
    );
    run_cli_ok_in(
        tmp.path(),
        &["summary", "--config", "pipeline.json", "--dataset", "posts"],
    )
    .stdout(predicate::str::contains("distinct posts\t6"));

    run_cli_fail_in(
        tmp.path(),
        &["summary", "--config", "pipeline.json", "--dataset", "other"],
    )
    .stderr(predicate::str::contains("no dataset 'other'"));
}

#[test]
fn cli_most_active_timeline_respects_cop_selection() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(
        &tmp,
        "active.csv",
        "id;lang;cop;author.userName;categories;createdAt\n\
         1;en;26;alice;Policy;2021-11-01 08:00:00\n\
         2;en;27;bob;Science;2022-11-08 09:00:00\n",
    );
    run_cli_ok_in(
        tmp.path(),
        &[
            "timeline",
            "--most-active-users",
            "--data",
            "active.csv",
            "--cop",
            "27",
        ],
    )
    .stdout(predicate::str::contains("day\tcategory\tcount"))
    .stdout(predicate::str::contains("2022-11-08\tScience\t1"))
    .stdout(predicate::str::contains("2021-11-01").not());
}

#[test]
fn cli_export_failure_is_not_reported_as_missing_data() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "cat.csv", CATEGORIZATION);
    write_file(&tmp, "blocker", "not a directory");
    run_cli_fail_in(
        tmp.path(),
        &[
            "summary",
            "--data",
            "cat.csv",
            "--export-format",
            "csv",
            "--out-dir",
            "blocker",
        ],
    )
    .stderr(predicate::str::contains("cannot export"))
    .stderr(predicate::str::contains("No data available").not());
}

#[test]
fn cli_options_accepts_dataset_kind_presets() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_file(&tmp, "entities.csv", ENTITIES);
    run_cli_ok_in(
        tmp.path(),
        &[
            "options",
            "--data",
            "entities.csv",
            "--preset",
            "entities",
            "--dimension",
            "cop_edition",
        ],
    )
    .stdout(predicate::str::contains("  26\n  27\n"));
}
