//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::LifecycleStatus;
use clap::Parser;
use std::path::PathBuf;

/// policy-reconcile - year-over-year insurance renewal analysis
///
/// Reconciles two annual policy snapshots by policy identifier, classifies
/// every policy as renewed, lapsed or new, and reports company migration
/// and agent performance.
///
/// Examples:
///   policy-reconcile --previous polizas-2025.json --current polizas-2026.json
///   policy-reconcile --previous https://host/polizas-2025.json --current https://host/polizas-2026.json --format json
///   policy-reconcile --previous a.json --current b.json --status lapsed --search garcia
///   policy-reconcile --previous a.json --current b.json --dry-run
///   policy-reconcile --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Year-N snapshot (file path or http(s) URL)
    ///
    /// Can also be set via POLICY_RECONCILE_PREVIOUS or the [loader] config section.
    #[arg(short, long, value_name = "SOURCE", env = "POLICY_RECONCILE_PREVIOUS")]
    pub previous: Option<String>,

    /// Year-N+1 snapshot (file path or http(s) URL)
    ///
    /// Can also be set via POLICY_RECONCILE_CURRENT or the [loader] config section.
    #[arg(short = 'n', long, value_name = "SOURCE", env = "POLICY_RECONCILE_CURRENT")]
    pub current: Option<String>,

    /// Calendar year of the previous snapshot
    #[arg(long, value_name = "YEAR")]
    pub prior_year: Option<u16>,

    /// Calendar year of the current snapshot
    #[arg(long, value_name = "YEAR")]
    pub current_year: Option<u16>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .policy-reconcile.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only list policies with this lifecycle status
    #[arg(long, value_name = "STATUS")]
    pub status: Option<StatusFilter>,

    /// Only list policies whose identifier or holder name contains this text
    #[arg(short, long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Only list policies from these year-N companies (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub company: Option<Vec<String>>,

    /// Maximum rows in the policy listing (0 = unlimited)
    #[arg(long, value_name = "COUNT")]
    pub max_records: Option<usize>,

    /// HTTP timeout in seconds for remote snapshots
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load and validate both snapshots, print counts, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .policy-reconcile.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Lifecycle status for --status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusFilter {
    Renewed,
    Lapsed,
    New,
}

impl From<StatusFilter> for LifecycleStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Renewed => LifecycleStatus::Renewed,
            StatusFilter::Lapsed => LifecycleStatus::Lapsed,
            StatusFilter::New => LifecycleStatus::New,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let (Some(prior), Some(current)) = (self.prior_year, self.current_year) {
            if current <= prior {
                return Err(format!(
                    "Current year ({}) must be after the previous year ({})",
                    current, prior
                ));
            }
        }

        for source in [&self.previous, &self.current].into_iter().flatten() {
            if source.trim().is_empty() {
                return Err("Snapshot source must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
