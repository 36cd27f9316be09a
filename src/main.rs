//! # DROMA CLI (`droma`)
//!
//! ## Usage
//!
//! ```bash
//! droma --config ./config/droma.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `droma init` | Create the SQLite database and annotation tables |
//! | `droma harmonize samples <INPUT>` | Resolve sample names against `sample_anno` |
//! | `droma harmonize drugs <INPUT>` | Resolve drug names against `drug_anno` |
//! | `droma annotation <sample\|drug>` | Print annotation rows |
//! | `droma tables` | List omics and drug tables |
//! | `droma projects` | List or refresh project metadata |

use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

use droma::annotation::{self, AnnotationQuery, AttributeValues, SampleAttributes};
use droma::catalog;
use droma::config;
use droma::harmonize::{self, ApplyTarget, OutputFormat, Overrides};
use droma::logging::{init_logging, LogConfig};
use droma::migrate;
use droma_core::models::EntityKind;

/// DROMA CLI: name harmonization and catalog queries over a DROMA
/// SQLite database.
#[derive(Parser)]
#[command(
    name = "droma",
    about = "DROMA: drug-response and omics database access and name harmonization",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/droma.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and the annotation tables.
    ///
    /// Idempotent: existing tables are left untouched.
    Init,

    /// Resolve names against an annotation table.
    Harmonize {
        #[command(subcommand)]
        target: HarmonizeTarget,
    },

    /// Print rows of an annotation table.
    Annotation {
        /// `sample` or `drug`.
        kind: EntityKind,

        /// Only rows of this project.
        #[arg(long)]
        project: Option<String>,

        /// Only these ids (repeatable).
        #[arg(long = "id")]
        ids: Vec<String>,

        #[arg(long)]
        limit: Option<i64>,

        /// `table` or `json`.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List omics and drug tables with feature and sample counts.
    Tables {
        /// Regex filter on table names.
        #[arg(long)]
        pattern: Option<String>,
    },

    /// List projects, optionally refreshing the `projects` table first.
    Projects {
        /// Recompute project metadata from the database contents.
        #[arg(long)]
        update: bool,

        /// Restrict to one project. Without `--update`, prints its data types.
        #[arg(long)]
        project: Option<String>,

        /// Dataset type recorded on update (e.g. CellLine, PDX, PDO).
        #[arg(long)]
        dataset_type: Option<String>,
    },
}

#[derive(Subcommand)]
enum HarmonizeTarget {
    /// Resolve sample names against `sample_anno`.
    Samples(HarmonizeArgs),
    /// Resolve drug names against `drug_anno`.
    Drugs(HarmonizeArgs),
}

#[derive(Args)]
struct HarmonizeArgs {
    /// File with one name per line (taken verbatim), or `-` for stdin.
    input: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Fuzzy acceptance threshold in [0, 1].
    #[arg(long)]
    max_distance: Option<f64>,

    /// Shortest name the partial tier will try.
    #[arg(long)]
    min_name_length: Option<usize>,

    /// Names longer than this are kept as-is.
    #[arg(long)]
    long_name_threshold: Option<usize>,

    /// Write the mapping back to the annotation table.
    #[arg(long, requires = "project")]
    apply: bool,

    /// Project assigned to rows added by `--apply`.
    #[arg(long)]
    project: Option<String>,

    /// DataType for added samples.
    #[arg(long)]
    data_type: Option<String>,

    /// TumorType for added samples.
    #[arg(long)]
    tumor_type: Option<String>,
}

impl HarmonizeArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            max_distance: self.max_distance,
            min_name_length: self.min_name_length,
            long_name_threshold: self.long_name_threshold,
        }
    }

    fn apply_target(&self) -> Option<ApplyTarget> {
        if !self.apply {
            return None;
        }
        let project = self.project.clone()?;
        Some(ApplyTarget {
            project,
            attrs: SampleAttributes {
                data_type: self.data_type.as_deref().map(AttributeValues::from),
                tumor_type: self.tumor_type.as_deref().map(AttributeValues::from),
                ..SampleAttributes::default()
            },
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config);
    let env_filter = std::env::var("RUST_LOG").ok();
    let log_config = LogConfig::resolve(
        env_filter.as_deref(),
        cli.verbose,
        cfg.as_ref().ok().map(|c| c.logging.filter.as_str()),
    )
    .with_ansi(std::io::stderr().is_terminal());
    init_logging(&log_config)?;

    let cfg = cfg?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Harmonize { target } => {
            let (kind, args) = match target {
                HarmonizeTarget::Samples(args) => (EntityKind::Sample, args),
                HarmonizeTarget::Drugs(args) => (EntityKind::Drug, args),
            };
            harmonize::run_harmonize(
                &cfg,
                kind,
                &args.input,
                args.format,
                &args.overrides(),
                args.apply_target(),
            )
            .await?;
        }
        Commands::Annotation {
            kind,
            project,
            ids,
            limit,
            format,
        } => {
            if format == OutputFormat::Csv {
                anyhow::bail!("annotation supports --format table or json");
            }
            let query = AnnotationQuery {
                kind,
                project,
                ids,
                limit,
            };
            annotation::run_annotation(&cfg, &query, format == OutputFormat::Json).await?;
        }
        Commands::Tables { pattern } => {
            catalog::run_tables(&cfg, pattern.as_deref()).await?;
        }
        Commands::Projects {
            update,
            project,
            dataset_type,
        } => {
            catalog::run_projects(&cfg, update, project.as_deref(), dataset_type.as_deref())
                .await?;
        }
    }

    Ok(())
}
