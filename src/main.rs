//! Site-Audit main entry point
//!
//! This is the command-line interface for the Site-Audit engine.

use anyhow::Context;
use clap::{Parser, Subcommand};
use site_audit::analysis::build_analyzer;
use site_audit::audit::{AuditOrchestrator, AuditRequest};
use site_audit::config::{load_config_with_hash, AuditConfig, Config};
use site_audit::output::{build_run_report, print_run_status, write_markdown_report};
use site_audit::storage::{lock_store, open_store, shared, MemoryStore, SharedStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Site-Audit: an incremental SEO/AEO website audit engine
///
/// Discovers a site's pages from robots.txt and sitemaps, stores them all as
/// pending work, and analyzes them in polite, resumable batches.
#[derive(Parser, Debug)]
#[command(name = "site-audit")]
#[command(version = "1.0.0")]
#[command(about = "An incremental SEO/AEO website audit engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// SQLite database path (overrides the configuration file)
    #[arg(long, value_name = "PATH", global = true, conflicts_with = "in_memory")]
    database: Option<PathBuf>,

    /// Keep everything in memory; nothing survives the process
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover a site and analyze the first batch of pages
    Run {
        /// Root URL of the site to audit
        root_url: String,

        /// Project the run belongs to
        #[arg(long, default_value = "default")]
        project: String,

        /// Cap on discovered pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Number of pages analyzed right away
        #[arg(long)]
        analyze: Option<usize>,

        /// Sitemap to try before the ones robots.txt declares
        #[arg(long)]
        sitemap: Option<String>,
    },

    /// Analyze more pending pages of a run
    ScanMore {
        run_id: i64,

        /// Number of pages to analyze
        #[arg(long)]
        count: Option<usize>,
    },

    /// Re-analyze a single stored page
    AnalyzePage { page_id: i64 },

    /// Queue a run's failed pages for another scan
    RetryFailed { run_id: i64 },

    /// Return pages left mid-analysis by an interrupted process to pending
    Recover { run_id: i64 },

    /// Show a run's page counts
    Status { run_id: i64 },

    /// Write a markdown report for a run
    Report {
        run_id: i64,

        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), String::new()),
    };

    let store = open_shared_store(&cli, &config)?;

    match cli.command {
        Command::Run {
            root_url,
            project,
            max_pages,
            analyze,
            sitemap,
        } => {
            let orchestrator = build_orchestrator(&config, store)?.with_config_hash(config_hash);
            let mut request = AuditRequest::new(project, root_url);
            request.max_pages_discovered = max_pages;
            request.max_pages_to_analyze = analyze;
            request.sitemap_url = sitemap;

            let result = orchestrator.run_audit(request).await?;
            println!("Run {}", result.run_id);
            println!("  Discovered: {}", result.discovered);
            println!("  Analyzed:   {}", result.analyzed);
            println!("  Failed:     {}", result.failed);
            println!("  Pending:    {}", result.pending);
        }
        Command::ScanMore { run_id, count } => {
            let orchestrator = build_orchestrator(&config, store)?;
            let count = count.unwrap_or(orchestrator.config().default_max_pages_to_scan);
            let result = orchestrator.scan_more_pages(run_id, count).await?;
            println!("Run {}", run_id);
            println!("  Analyzed: {}", result.analyzed);
            println!("  Failed:   {}", result.failed);
            println!("  Pending:  {}", result.pending);
        }
        Command::AnalyzePage { page_id } => {
            let orchestrator = build_orchestrator(&config, store)?;
            let result = orchestrator.analyze_stored_page(page_id).await?;
            println!("Page {} ({}): {}", result.page_id, result.url, result.status);
            if let Some(score) = result.score {
                println!("  Score: {} ({} issues)", score, result.issue_count);
            }
            if let Some(error) = result.error {
                println!("  Error: {}", error);
            }
        }
        Command::RetryFailed { run_id } => {
            let orchestrator = build_orchestrator(&config, store)?;
            let reset = orchestrator.retry_failed_pages(run_id)?;
            println!("✓ {} failed pages queued for the next scan", reset);
        }
        Command::Recover { run_id } => {
            let orchestrator = build_orchestrator(&config, store)?;
            let recovered = orchestrator.recover_interrupted_pages(run_id)?;
            println!("✓ {} interrupted pages returned to pending", recovered);
        }
        Command::Status { run_id } => {
            let orchestrator = build_orchestrator(&config, store)?;
            print_run_status(&orchestrator.run_status(run_id)?);
        }
        Command::Report { run_id, output } => handle_report(&store, run_id, output.as_deref())?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_audit=info,warn"),
            1 => EnvFilter::new("site_audit=debug,info"),
            2 => EnvFilter::new("site_audit=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_shared_store(cli: &Cli, config: &Config) -> anyhow::Result<SharedStore> {
    if cli.in_memory {
        tracing::info!("Using in-memory store");
        return Ok(shared(MemoryStore::new()));
    }

    let path = cli
        .database
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.storage.database_path));
    tracing::info!("Database: {}", path.display());
    let store = open_store(&path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(shared(store))
}

fn build_orchestrator(config: &Config, store: SharedStore) -> anyhow::Result<AuditOrchestrator> {
    let analyzer = build_analyzer(&config.analyzer)?;
    Ok(AuditOrchestrator::new(
        AuditConfig::from_config(config),
        store,
        analyzer,
    )?)
}

/// Handles the report command: aggregates a run and writes markdown
fn handle_report(store: &SharedStore, run_id: i64, output: Option<&Path>) -> anyhow::Result<()> {
    let report = {
        let store = lock_store(store)?;
        build_run_report(&*store, run_id)?
    };

    match output {
        Some(path) => {
            write_markdown_report(&report, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✓ Report written to: {}", path.display());
        }
        None => print!("{}", site_audit::output::format_markdown_report(&report)),
    }

    Ok(())
}
