use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "qgate")]
#[command(about = "Query budgets and baseline regressions for CI", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate summary files and gate them against budgets
    Check(CheckArgs),

    /// Write a starter qgate.toml in the current directory
    Init {
        /// Overwrite an existing qgate.toml
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Summary JSON files to aggregate
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Fail when the total query count exceeds N
    #[arg(long, value_name = "N")]
    pub max_queries: Option<u64>,

    /// Fail when the average duration exceeds this many milliseconds
    #[arg(long, value_name = "MS")]
    pub max_average_ms: Option<f64>,

    /// Fail when the total duration exceeds this many milliseconds
    #[arg(long, value_name = "MS")]
    pub max_total_ms: Option<f64>,

    /// Pattern budget: "<pattern>=<max>" or "regex:<pattern>=<max>"
    #[arg(long = "budget", value_name = "SPEC")]
    pub budgets: Vec<String>,

    /// Baseline summary to compare against (or to write with --write-baseline)
    #[arg(long, value_name = "PATH")]
    pub baseline: Option<PathBuf>,

    /// Allowed regression over the baseline, in percent (default from config: 10)
    #[arg(long, value_name = "PERCENT")]
    pub baseline_allowed_percent: Option<f64>,

    /// Write the aggregate to --baseline instead of comparing against it
    #[arg(long, requires = "baseline")]
    pub write_baseline: bool,

    /// Reject inputs that only carry a Top-N event sample
    #[arg(long)]
    pub require_full_events: bool,

    /// Also write the Markdown report to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Append the Markdown report to this file
    #[arg(long, value_name = "PATH", env = "GITHUB_STEP_SUMMARY")]
    pub step_summary: Option<PathBuf>,

    /// Config file (default: nearest qgate.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
