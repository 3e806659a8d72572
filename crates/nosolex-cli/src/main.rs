//! nosolex: normalise free-text disease labels against a curated synonym dictionary.
//! Entry point for the `nosolex` binary.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "nosolex",
    version,
    about = "Normalise disease-name labels against a synonym dictionary"
)]
struct Cli {
    /// Dictionary file (overrides [dictionary].path)
    #[arg(long, global = true)]
    dictionary: Option<PathBuf>,
    /// Fail on malformed dictionary lines or repeated keys instead of skipping them
    #[arg(long, global = true)]
    strict: bool,
    /// Config file (default: $NOSOLEX_CONFIG, then ./nosolex.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Normalise a corpus (one label per line) into an aligned output file
    Normalize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Take this tab-separated field (0-based) from each row
        #[arg(long)]
        column: Option<usize>,
        /// Also write unresolved rows (row, raw, key, reason) here
        #[arg(long)]
        unmatched: Option<PathBuf>,
    },
    /// Print dictionary coverage of a corpus
    Stats {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        column: Option<usize>,
        /// Write candidate dictionary entries (JSONL) for unmatched labels
        #[arg(long)]
        candidates: Option<PathBuf>,
    },
    /// Merge new entries into the dictionary
    Update {
        /// JSONL file of entries to merge
        #[arg(long)]
        from: PathBuf,
        /// Write the merged dictionary here instead of rewriting it in place
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check entries against the current canonicalisation rules
    Validate,
    /// Case-insensitive search over variants and canonical labels
    Search { term: String },
    /// Copy the dictionary into the backup directory
    Backup,
    /// Print dictionary statistics
    Summary,
}

fn main() -> Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nosolex=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!("nosolex {}", env!("CARGO_PKG_VERSION"));

    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.dictionary {
        config.dictionary.path = path;
    }
    if cli.strict {
        config.dictionary.strict = true;
    }
    debug!("Dictionary: {} ({:?} load)", config.dictionary.path.display(), config.load_mode());

    match cli.cmd {
        Cmd::Normalize { input, output, column, unmatched } => {
            commands::normalize::run(&config, &input, &output, column, unmatched.as_deref())
        }
        Cmd::Stats { input, column, candidates } => {
            commands::stats::run(&config, &input, column, candidates.as_deref())
        }
        Cmd::Update { from, output } => commands::update::run(&config, &from, output.as_deref()),
        Cmd::Validate => commands::maintain::validate(&config),
        Cmd::Search { term } => commands::maintain::search(&config, &term),
        Cmd::Backup => commands::maintain::backup(&config),
        Cmd::Summary => commands::maintain::summary(&config),
    }
}
