//! policy-reconcile - year-over-year insurance renewal analysis
//!
//! A CLI tool that reconciles two annual policy snapshots, classifies every
//! policy as renewed, lapsed or new, and reports company migration and agent
//! performance.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime or data-quality error (bad config, duplicate ids, missing fields, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;

use analysis::{Analysis, RecordFilter};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use loader::{SnapshotLoader, SnapshotPair, SnapshotRepository};
use models::ReportMetadata;
use report::Report;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("policy-reconcile v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Reconciliation failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .policy-reconcile.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set snapshot sources, years, field names and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete reconciliation workflow.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let sources = SnapshotPair::from_config(&config)?;
    let loader = SnapshotLoader::new(config.loader.timeout(), config.fields.clone())?;

    // Step 1: Load both snapshots
    println!("📥 Loading snapshots...");
    println!(
        "   {}: {} (key \"{}\")",
        config.period.prior_year, sources.prior, sources.prior_key
    );
    println!(
        "   {}: {} (key \"{}\")",
        config.period.current_year, sources.current, sources.current_key
    );

    let spinner = loading_spinner(args.quiet);
    let repository = SnapshotRepository::load(loader, sources).await;
    spinner.finish_and_clear();

    println!(
        "   Loaded {} + {} records",
        repository.prior().len(),
        repository.current().len()
    );

    if repository.prior().is_empty() && repository.current().is_empty() {
        warn!("Both snapshots are empty; the report will contain no policies");
    }

    // Step 2: Reconcile
    println!("\n🔬 Reconciling policies...");
    let analysis = repository
        .analyze()
        .context("Snapshot data failed validation")?;

    if args.dry_run {
        return handle_dry_run(&repository, &analysis);
    }

    // Step 3: Build the report
    println!("\n📝 Generating report...");

    let filter = record_filter(&args);
    let summary = analysis.summary.clone();

    let metadata = ReportMetadata {
        prior_source: repository.sources().prior.to_string(),
        current_source: repository.sources().current.to_string(),
        prior_year: config.period.prior_year,
        current_year: config.period.current_year,
        generated_at: Utc::now(),
        unified_policies: 0,
        record_filter: None,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let report = Report::assemble(metadata, analysis, &filter, &config.report);
    let output = report::render(&report, args.format)?;

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Renewal Summary:");
    println!(
        "   {} policies: {} | {} policies: {}",
        config.period.prior_year,
        summary.prior.policies,
        config.period.current_year,
        summary.current.policies
    );
    println!(
        "   - 🟢 Renewed: {} | 🔴 Lapsed: {} | 🔵 New: {}",
        summary.renewed.policies, summary.lapsed.policies, summary.new.policies
    );
    println!(
        "   Retention: {}% | Members: {} → {}",
        summary.retention_rate(),
        summary.prior.members,
        summary.current.members
    );
    if report.metadata.record_filter.is_some() {
        println!("   Listed policies: {}", report.records_matched);
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!(
        "\n✅ Reconciliation complete! Report saved to: {}",
        output_path.display()
    );

    Ok(())
}

/// Handle --dry-run: print what was loaded and how it reconciles, write nothing.
fn handle_dry_run(repository: &SnapshotRepository, analysis: &Analysis) -> Result<()> {
    println!("\n🔍 Dry run: no report will be written\n");

    println!(
        "   {} records in {}",
        repository.prior().len(),
        repository.sources().prior
    );
    println!(
        "   {} records in {}",
        repository.current().len(),
        repository.sources().current
    );
    println!("   {} unified policies", analysis.policies.len());
    println!(
        "     🟢 {} renewed | 🔴 {} lapsed | 🔵 {} new",
        analysis.summary.renewed.policies,
        analysis.summary.lapsed.policies,
        analysis.summary.new.policies
    );
    println!(
        "   {} migration edges, {} agents",
        analysis.migration.edges.len(),
        analysis.agents.len()
    );

    println!("\n✅ Dry run complete. Both snapshots passed validation.");
    Ok(())
}

/// Build the policy listing filter from CLI arguments.
fn record_filter(args: &Args) -> RecordFilter {
    RecordFilter {
        status: args.status.map(Into::into),
        search: args
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(String::from),
        companies: args
            .company
            .iter()
            .flatten()
            .map(|company| company.trim().to_string())
            .filter(|company| !company.is_empty())
            .collect(),
    }
}

fn loading_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message("Fetching snapshots");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
