//! Plain-text rendering and file export of result tables.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::prelude::*;
use clap::ValueEnum;
use csv::WriterBuilder;
use log::info;

use crate::views::Table;

/// Message shown instead of an empty table.
pub const NO_DATA: &str = "No data for this selection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Txt,
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }
}

/// Neutralise cells a spreadsheet would read as a formula (leading `=`, `+`,
/// `-`, `@`, tab or carriage return) by prefixing a single quote. Cells that
/// already start with a quote are left alone.
pub fn csv_safe_cell(cell: String) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{cell}"),
        _ => cell,
    }
}

/// Render a table for a terminal: title line, then one indented,
/// tab-separated line per row.
pub fn render_text(table: &Table) -> String {
    let mut out = format!("{}:\n", table.title);
    if table.is_empty() {
        out.push_str("  ");
        out.push_str(NO_DATA);
        out.push('\n');
        return out;
    }
    out.push_str("  ");
    out.push_str(&table.headers.join("\t"));
    out.push('\n');
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        out.push_str("  ");
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

/// Write `table` into `dir` as `<stem>_<YYYYMMDD_HHMMSS>_<name>.<ext>` and
/// return the path written.
pub fn export_table(
    table: &Table,
    dir: &Path,
    stem: &str,
    name: &str,
    format: ExportFormat,
) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{stem}_{stamp}_{name}.{}", format.extension()));
    let file = File::create(&path)?;
    match format {
        ExportFormat::Txt => {
            let mut w = BufWriter::new(file);
            w.write_all(render_text(table).as_bytes())?;
            w.flush()?;
        }
        ExportFormat::Csv => write_delimited(table, file, b',')?,
        ExportFormat::Tsv => write_delimited(table, file, b'\t')?,
        ExportFormat::Json => {
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, table)?;
            w.flush()?;
        }
    }
    info!("exported '{}' to {}", table.title, path.display());
    Ok(path)
}

fn write_delimited<W: Write>(table: &Table, out: W, delimiter: u8) -> io::Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(out);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|v| csv_safe_cell(v.to_string())))?;
    }
    wtr.flush()
}
