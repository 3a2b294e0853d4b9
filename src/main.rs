//! Featured-Backfill main entry point
//!
//! This is the command-line interface for the featured image backfill.

use clap::Parser;
use featured_backfill::backfill::plan_scan;
use featured_backfill::config::{load_config_with_hash, Config};
use featured_backfill::output::{LineReporter, LogReporter, Reporter};
use featured_backfill::storage::open_storage;
use featured_backfill::trigger::{issue_token, run_confirmed};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Featured-Backfill: set missing featured images from record content
///
/// For every published record without a featured image, downloads the first
/// image in its body, converts it to the target format and attaches it.
/// A run writes to the store, so it must be confirmed with a one-time token
/// obtained from --issue-token.
#[derive(Parser, Debug)]
#[command(name = "featured-backfill")]
#[command(version = "1.0.0")]
#[command(about = "Backfill featured images from record content", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print a one-time confirmation token for a run and exit
    #[arg(long, conflicts_with_all = ["confirm", "dry_run", "stats"])]
    issue_token: bool,

    /// Run the backfill, confirmed by a token from --issue-token
    #[arg(long, value_name = "TOKEN", conflicts_with_all = ["dry_run", "stats"])]
    confirm: Option<String>,

    /// List candidate records and their first image without fetching or writing
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show featured image statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Also append report lines to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.issue_token {
        handle_issue_token(&config, &config_hash)?;
    } else if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(token) = cli.confirm.as_deref() {
        handle_run(&config, &config_hash, token, cli.log_file.as_deref()).await?;
    } else {
        tracing::error!("Refusing to run without --confirm TOKEN");
        return Err("a run must be confirmed: obtain a token with --issue-token, \
                    then pass it with --confirm TOKEN"
            .into());
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
            0 => EnvFilter::new("featured_backfill=info,warn"),
            1 => EnvFilter::new("featured_backfill=debug,info"),
            2 => EnvFilter::new("featured_backfill=trace,debug"),
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

/// Handles the --issue-token mode: stores and prints a confirmation token
fn handle_issue_token(config: &Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(&config.storage)?;
    let token = issue_token(&mut storage, config_hash)?;

    println!("{}", token);
    eprintln!(
        "Token is valid for {}s. Start the run with --confirm {}",
        config.trigger.token_ttl_secs, token
    );

    Ok(())
}

/// Handles the --dry-run mode: shows what a run would attempt
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Featured-Backfill Dry Run ===\n");

    println!("Fetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  User agent: {}", config.fetcher.user_agent);

    println!("\nNormalizer:");
    println!("  Target: {}", config.normalizer.target_mime);
    println!("  JPEG quality: {}", config.normalizer.jpeg_quality);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Media: {}", config.storage.media_dir);
    println!("  Scratch: {}", config.storage.temp_dir().display());

    let storage = open_storage(&config.storage)?;
    let candidates = plan_scan(config, &storage)?;

    println!(
        "\nPublished '{}' records ({}):",
        config.scan.record_type,
        candidates.len()
    );

    let mut would_fetch = 0;
    for candidate in &candidates {
        let action = if candidate.has_featured_image {
            "skip (already set)".to_string()
        } else if let Some(url) = &candidate.image_url {
            would_fetch += 1;
            format!("fetch {}", url)
        } else {
            "skip (no image)".to_string()
        };
        println!(
            "  - #{} \"{}\": {}",
            candidate.record_id, candidate.title, action
        );
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would fetch {} images", would_fetch);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use featured_backfill::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(&config.storage)?;
    let stats = load_statistics(&storage, &config.scan.record_type)?;
    print_statistics(&config.scan.record_type, &stats);

    Ok(())
}

/// Handles the main backfill run
async fn handle_run(
    config: &Config,
    config_hash: &str,
    token: &str,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(&config.storage)?;

    let mut reporters: Vec<Box<dyn Reporter>> = vec![Box::new(LogReporter::new())];
    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::info!("Appending report to {}", path.display());
        reporters.push(Box::new(LineReporter::new(file)));
    }

    // The token is only spent once the pipeline is ready to start
    match run_confirmed(config, config_hash, token, &mut storage, &mut reporters).await {
        Ok(outcomes) => {
            tracing::debug!("Scan finished with {} outcomes", outcomes.len());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scan failed: {}", e);
            Err(e.into())
        }
    }
}
