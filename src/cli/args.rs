//! Command line argument parsing for the Reelmatch CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Reelmatch - item-to-item movie recommendations
#[derive(Parser, Debug, Clone)]
#[command(name = "reelmatch")]
#[command(about = "Build and query exact and approximate movie similarity indexes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct ReelmatchArgs {
    /// Verbosity level (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl ReelmatchArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build an artifact set from item and rating tables
    Build(BuildArgs),

    /// Recommend items similar to one title
    Recommend(RecommendArgs),

    /// Answer a JSON Lines file of requests concurrently
    Batch(BatchArgs),

    /// Show artifact set statistics
    Stats(StatsArgs),
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build(_) => "build",
            Command::Recommend(_) => "recommend",
            Command::Batch(_) => "batch",
            Command::Stats(_) => "stats",
        }
    }
}

/// Arguments for building an artifact set
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Directory the artifact set is written to
    #[arg(value_name = "ARTIFACT_DIR")]
    pub artifact_dir: PathBuf,

    /// Item table (JSON Lines: title, external_id, genres, year)
    #[arg(long, value_name = "ITEMS_FILE")]
    pub items: PathBuf,

    /// Rating table (JSON Lines: user, item, rating)
    #[arg(long, value_name = "RATINGS_FILE")]
    pub ratings: PathBuf,

    /// Item titles carry a trailing "(YYYY)" and genres are "|"-separated
    #[arg(long)]
    pub raw_titles: bool,

    /// Build configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "REELMATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the variance threshold
    #[arg(long)]
    pub variance_threshold: Option<f64>,

    /// Override the number of trees in the approximate index
    #[arg(long)]
    pub n_trees: Option<usize>,

    /// Override the approximate index seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Replace an existing artifact set
    #[arg(long)]
    pub force: bool,
}

/// Arguments for a single recommendation
#[derive(Parser, Debug, Clone)]
pub struct RecommendArgs {
    /// Directory holding the artifact set
    #[arg(value_name = "ARTIFACT_DIR")]
    pub artifact_dir: PathBuf,

    /// Exact title of the query item
    #[arg(value_name = "TITLE")]
    pub title: String,

    /// Index to query: exact or approximate
    #[arg(short, long, default_value = "exact")]
    pub model: String,

    /// Number of recommendations
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,

    /// Maximum suggestions shown for an unknown title
    #[arg(long, default_value = "5")]
    pub suggestions: usize,
}

/// Arguments for batch recommendation
#[derive(Parser, Debug, Clone)]
pub struct BatchArgs {
    /// Directory holding the artifact set
    #[arg(value_name = "ARTIFACT_DIR")]
    pub artifact_dir: PathBuf,

    /// Request file (JSON Lines: model, n_recommendations, title)
    #[arg(value_name = "REQUESTS_FILE")]
    pub requests: PathBuf,

    /// Worker threads (default: one per core)
    #[arg(short, long)]
    pub threads: Option<usize>,
}

/// Arguments for showing statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    /// Directory holding the artifact set
    #[arg(value_name = "ARTIFACT_DIR")]
    pub artifact_dir: PathBuf,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
