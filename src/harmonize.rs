//! `droma harmonize`: read names, resolve them against an annotation
//! table, print the mapping and optionally write it back.

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::info;

use droma_core::harmonize::{harmonize, HarmonizeOptions};
use droma_core::models::{EntityKind, MatchResult};
use droma_core::report::summarize;

use crate::annotation::{update_annotation, SampleAttributes};
use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Output rendering for match results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

/// Per-call overrides of the `[harmonize]` config section.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_distance: Option<f64>,
    pub min_name_length: Option<usize>,
    pub long_name_threshold: Option<usize>,
}

/// Write-back target for `--apply`.
#[derive(Debug, Clone)]
pub struct ApplyTarget {
    pub project: String,
    pub attrs: SampleAttributes,
}

pub fn resolve_options(config: &Config, kind: EntityKind, overrides: &Overrides) -> HarmonizeOptions {
    let mut options = config.harmonize.options_for(kind);
    if let Some(d) = overrides.max_distance {
        options.matching.max_distance = d;
    }
    if let Some(n) = overrides.min_name_length {
        options.matching.min_name_length = n;
    }
    if let Some(t) = overrides.long_name_threshold {
        options.matching.long_name_threshold = Some(t);
    }
    options
}

/// One name per line, kept verbatim apart from the line ending. Blank lines
/// are skipped.
pub fn parse_names(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Read names from a file, or from stdin when `input` is `-`.
pub fn read_names(input: &str) -> Result<Vec<String>> {
    let content = if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read names from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read names file: {}", input))?
    };
    Ok(parse_names(&content))
}

pub async fn run_harmonize(
    config: &Config,
    kind: EntityKind,
    input: &str,
    format: OutputFormat,
    overrides: &Overrides,
    apply: Option<ApplyTarget>,
) -> Result<()> {
    let names = read_names(input)?;
    let options = resolve_options(config, kind, overrides);

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let results = harmonize(&store, kind, &names, &options).await?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render(&results, format, &mut out)?;
    out.flush()?;

    if let Some(target) = apply {
        let summary =
            update_annotation(store.pool(), kind, &results, &target.project, &target.attrs).await?;
        info!(
            added = summary.added,
            skipped = summary.skipped,
            project = %target.project,
            "applied harmonized names"
        );
    }

    store.pool().close().await;
    Ok(())
}

pub fn render<W: Write>(results: &[MatchResult], format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Csv => render_csv(results, out),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, results)?;
            writeln!(out)?;
            Ok(())
        }
        OutputFormat::Table => render_table(results, out),
    }
}

fn render_csv<W: Write>(results: &[MatchResult], out: &mut W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    if results.is_empty() {
        writer.write_record(HEADERS)?;
    }
    for r in results {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}

const HEADERS: [&str; 6] = [
    "original_name",
    "cleaned_name",
    "harmonized_name",
    "match_type",
    "match_confidence",
    "new_name",
];

fn row_cells(r: &MatchResult) -> [String; 6] {
    [
        r.original_name.clone(),
        r.cleaned_name.clone(),
        r.harmonized_name.clone(),
        r.match_type.tag(),
        r.match_confidence.to_string(),
        r.new_name().to_string(),
    ]
}

fn render_table<W: Write>(results: &[MatchResult], out: &mut W) -> Result<()> {
    let rows: Vec<[String; 6]> = results.iter().map(row_cells).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    writeln!(out, "{}", line(&header[..]))?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", line(&rule[..]))?;
    for row in &rows {
        writeln!(out, "{}", line(&row[..]))?;
    }

    let summary = summarize(results);
    writeln!(out)?;
    writeln!(out, "{} names", summary.total)?;
    writeln!(out, "Match types:")?;
    for (match_type, count) in &summary.by_type {
        writeln!(out, "  {:<20} {}", match_type.tag(), count)?;
    }
    writeln!(out, "Confidence:")?;
    for (confidence, count) in &summary.by_confidence {
        writeln!(out, "  {:<20} {}", confidence.as_str(), count)?;
    }
    Ok(())
}
