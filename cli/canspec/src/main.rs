//! canspec: parse, diff and assess CAN bus specifications.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::SourceFile;
use config::CanspecConfig;

#[derive(Parser)]
#[command(
    name = "canspec",
    version,
    about = "CAN bus specification diff and compatibility checks"
)]
struct Cli {
    /// Configuration file (default: canspec.toml in the working directory or a parent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a specification and show its canonical form
    Parse {
        /// Specification file (.csv, .json or .dbc)
        file: PathBuf,
        /// Format tag, overriding the file extension
        #[arg(long)]
        format: Option<String>,
        /// Skip malformed rows instead of failing
        #[arg(long)]
        skip_malformed: bool,
        /// Print the canonical specification as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show structural differences between two specifications
    Diff {
        /// Baseline specification
        old: PathBuf,
        /// New specification
        new: PathBuf,
        /// Format tag for the baseline
        #[arg(long)]
        old_format: Option<String>,
        /// Format tag for the new specification
        #[arg(long)]
        new_format: Option<String>,
        /// Print diffs and summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assess whether a new specification is compatible with a baseline
    Check {
        /// Baseline specification
        old: PathBuf,
        /// New specification
        new: PathBuf,
        /// Format tag for the baseline
        #[arg(long)]
        old_format: Option<String>,
        /// Format tag for the new specification
        #[arg(long)]
        new_format: Option<String>,
        /// Consumers file of [[consumer]] tables; the verdict is computed
        /// fresh, outside the assessment cache
        #[arg(long)]
        consumers: Option<PathBuf>,
        /// Cache context for the verdict (default: [analysis] context from the config)
        #[arg(long, conflicts_with = "consumers")]
        context: Option<String>,
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = load_config(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Parse {
            file,
            format,
            skip_malformed,
            json,
        } => {
            let source = SourceFile::read(&file, format.as_deref())?;
            commands::parse::run(&source, skip_malformed, json)
        }

        Commands::Diff {
            old,
            new,
            old_format,
            new_format,
            json,
        } => {
            let old = SourceFile::read(&old, old_format.as_deref())?;
            let new = SourceFile::read(&new, new_format.as_deref())?;
            commands::diff::run(&config, old, new, json)
        }

        Commands::Check {
            old,
            new,
            old_format,
            new_format,
            consumers,
            context,
            json,
        } => {
            let old = SourceFile::read(&old, old_format.as_deref())?;
            let new = SourceFile::read(&new, new_format.as_deref())?;
            commands::check::run(
                &config,
                old,
                new,
                consumers.as_deref(),
                context.as_deref(),
                json,
            )
        }
    }
}

/// The explicit config file, else `canspec.toml` found from `cwd` upward,
/// else defaults.
fn load_config(explicit: Option<&Path>, cwd: &Path) -> anyhow::Result<CanspecConfig> {
    if let Some(path) = explicit {
        return CanspecConfig::load(path);
    }
    match CanspecConfig::find_and_load(cwd)? {
        Some((loaded, dir)) => {
            debug!(dir = %dir.display(), "loaded {}", config::CONFIG_FILE);
            Ok(loaded)
        }
        None => Ok(CanspecConfig::default()),
    }
}
