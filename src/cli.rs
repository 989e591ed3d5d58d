//! Command-line interface argument parsing.

use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

/// Student Analytics Dashboard API
///
/// Serves student records, class statistics and narrative insights for
/// the dashboard frontend.
///
/// Examples:
///   student_dashboard
///   student_dashboard --students data/students.csv --port 9000
///   student_dashboard --offline --seed 42
///   student_dashboard --print-config > dashboard.toml
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML configuration file (defaults to ./dashboard.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// CSV or JSON file with student records
    #[arg(short, long, value_name = "FILE")]
    pub students: Option<PathBuf>,

    /// Seed for the generated sample cohort
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use the offline extractive summarizer instead of the language model
    #[arg(long)]
    pub offline: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}
