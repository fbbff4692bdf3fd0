use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fieldfill",
    about = "Backfill a derived attribute across a DynamoDB table",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to config file (defaults to ./fieldfill.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a fieldfill.toml template in the current directory
    Init {
        /// Overwrite an existing fieldfill.toml
        #[arg(long)]
        force: bool,
    },

    /// Count records missing the target field without modifying anything
    Scan {
        #[command(flatten)]
        table: TableArgs,

        /// Number of candidate keys to list
        #[arg(long, default_value_t = 20)]
        show: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Copy the source field into the target field on every record missing it
    Run {
        #[command(flatten)]
        table: TableArgs,

        #[command(flatten)]
        run: RunArgs,

        /// Output format for the final summary
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Table location and attribute names, shared by `scan` and `run`
#[derive(Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// DynamoDB table name
    #[arg(long, env = "FIELDFILL_TABLE")]
    pub table: Option<String>,

    /// AWS region (falls back to the SDK's region chain)
    #[arg(long, env = "FIELDFILL_REGION")]
    pub region: Option<String>,

    /// Endpoint override, e.g. http://localhost:4566 for LocalStack
    #[arg(long, env = "FIELDFILL_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Per-operation timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Partition key attribute
    #[arg(long)]
    pub partition_key: Option<String>,

    /// Sort key attribute
    #[arg(long)]
    pub sort_key: Option<String>,

    /// Attribute whose value is copied
    #[arg(long)]
    pub source_field: Option<String>,

    /// Attribute to backfill
    #[arg(long)]
    pub target_field: Option<String>,
}

/// Update-phase tuning for `run`
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Scan and validate candidates but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Scan the whole table before the first update (exact progress total)
    #[arg(long)]
    pub collect: bool,

    /// Maximum in-flight updates (1 = strictly sequential)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Items evaluated per Scan request
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Report progress every N successful updates
    #[arg(long)]
    pub progress_every: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
