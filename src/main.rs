mod cache_cmd;
mod display;
mod history_cmd;
mod rank_cmd;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use display::OutputFormat;
use std::path::PathBuf;
use vibe_auditor::config::{self, Config};
use vibe_auditor::logging;

#[derive(Parser)]
#[command(
    name = "vibe-auditor",
    version,
    about = "Result cache, file ranking and issue history for code audits",
    long_about = "Keeps per-project audit state: memoized analysis results invalidated by TTL and file metadata, a heuristic ranking of the files most worth reviewing, and a history of issue counts with trend reporting."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format: text, json
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and maintain the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Record and inspect audit runs
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Rank project files by review importance
    Rank {
        /// Files per round (default from config)
        #[arg(short = 'n', long)]
        max_files: Option<usize>,

        /// Number of successive batches, each skipping earlier picks
        #[arg(short, long, default_value = "1")]
        rounds: usize,

        /// Show per-signal score contributions
        #[arg(long)]
        explain: bool,
    },

    /// Show or create configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Entry count, file size and per-entry age
    Stats,
    /// Report whether KEY would hit against the current project files
    Check {
        #[arg(long)]
        key: String,
    },
    /// Remove one entry, or the whole cache when no key is given
    Clear {
        #[arg(long)]
        key: Option<String>,
    },
    /// Remove expired entries
    Cleanup,
}

#[derive(Subcommand)]
pub(crate) enum HistoryAction {
    /// Append one run's issue counts
    Record {
        /// Analysis mode label (e.g. deployment, personal)
        #[arg(long)]
        mode: String,
        #[arg(long, default_value = "0")]
        critical: u64,
        #[arg(long, default_value = "0")]
        warning: u64,
        #[arg(long, default_value = "0")]
        info: u64,
        /// AI review counts; any of these records an AI summary
        #[arg(long)]
        ai_critical: Option<u64>,
        #[arg(long)]
        ai_warning: Option<u64>,
        #[arg(long)]
        ai_info: Option<u64>,
    },
    /// Recorded runs, newest first
    Show {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Latest change and the full timeline
    Trend,
    /// Write history and trend as JSON, or the timeline as CSV
    Export {
        output: PathBuf,
        #[arg(long)]
        csv: bool,
    },
    /// Delete all recorded runs
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default .vibe-auditor.toml into the project
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let project = cli.project;
    if !project.is_dir() {
        anyhow::bail!("Project directory not found: {}", project.display());
    }

    let load_config = || Config::load(&project).context("Failed to load configuration");

    match cli.command {
        Commands::Cache { action } => {
            cache_cmd::run(action, &project, &load_config()?, cli.format)?;
        }
        Commands::History { action } => {
            history_cmd::run(action, &project, &load_config()?, cli.format)?;
        }
        Commands::Rank {
            max_files,
            rounds,
            explain,
        } => {
            rank_cmd::run(&project, &load_config()?, max_files, rounds, explain, cli.format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => config::show_config(&project)?,
            ConfigAction::Init => {
                let path = Config::create_default(&project)?;
                println!("Created config: {}", path.display());
            }
        },
    }

    Ok(())
}
