//! RIA Cars main entry point
//!
//! This is the command-line interface for the used-car listings harvester.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ria_cars::api;
use ria_cars::config::{resolve_config, Config};
use ria_cars::jobs::{JobRunner, Scheduler};
use ria_cars::storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// RIA Cars: a used-car listings harvester
///
/// Walks the paginated listing pages, extracts a record from every vehicle
/// detail page and keeps them in SQLite. Runs once from the command line or
/// as a service with an HTTP API and daily crawl/dump triggers.
#[derive(Parser, Debug)]
#[command(name = "ria-cars")]
#[command(version = "1.0.0")]
#[command(about = "A used-car listings harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and run the daily schedule
    Serve {
        /// Do not start the daily crawl and dump triggers
        #[arg(long)]
        no_schedule: bool,
    },

    /// Run one crawl and exit
    Crawl,

    /// Write one database snapshot and exit
    Dump,

    /// Validate the configuration and print it
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, hash) = resolve_config(cli.config.as_deref(), |name| std::env::var(name).ok())
        .context("Failed to load configuration")?;

    match &cli.config {
        Some(path) => tracing::info!(
            "Loaded configuration from {} (sha256 {})",
            path.display(),
            hash.as_deref().unwrap_or("-")
        ),
        None => tracing::info!("Using built-in configuration defaults"),
    }

    match cli.command {
        Command::Serve { no_schedule } => serve(config, no_schedule).await,
        Command::Crawl => {
            let runner = open_runner(config)?;
            match runner.run_crawl().await? {
                Some(summary) => println!("{}", summary),
                None => println!("A crawl is already running"),
            }
            Ok(())
        }
        Command::Dump => {
            let runner = open_runner(config)?;
            let path = runner.run_dump().await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Check => {
            print_config(&config);
            Ok(())
        }
    }
}

/// Sets up logging based on verbosity flags
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ria_cars=info,warn"),
            1 => EnvFilter::new("ria_cars=debug,info"),
            2 => EnvFilter::new("ria_cars=trace,debug"),
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

fn open_runner(config: Config) -> anyhow::Result<JobRunner> {
    let shared = storage::open_shared(Path::new(&config.storage.database_path))
        .with_context(|| format!("Failed to open database {}", config.storage.database_path))?;
    Ok(JobRunner::new(config, shared))
}

async fn serve(config: Config, no_schedule: bool) -> anyhow::Result<()> {
    let bind_address = config.server.bind_address.clone();
    let schedule = config.schedule.clone();
    let runner = open_runner(config)?;

    let scheduler = if no_schedule {
        None
    } else {
        Scheduler::start(runner.clone(), &schedule)
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down...");
    };

    api::serve(runner, &bind_address, shutdown).await?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }

    Ok(())
}

/// Prints the resolved configuration
fn print_config(config: &Config) {
    println!("=== RIA Cars Configuration ===\n");

    println!("Site:");
    println!("  Listing URL: {}", config.site.listing_url);
    println!("  Base URL: {}", config.site.base_url);
    println!("  Phone URL: {}", config.site.phone_url);
    println!("  Detail marker: {}", config.site.detail_marker);

    println!("\nCrawler:");
    println!("  Workers: {}", config.crawler.max_workers);
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!(
        "  Stop after empty pages: {}",
        config.crawler.max_empty_pages
    );
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!(
        "  Dumps: {} (via {})",
        config.storage.dump_dir, config.storage.dump_utility
    );

    println!("\nServer:");
    println!("  Bind address: {}", config.server.bind_address);

    println!("\nSchedule (UTC):");
    if config.schedule.enabled {
        println!(
            "  Crawl: {:02}:{:02}",
            config.schedule.crawl_hour, config.schedule.crawl_minute
        );
        println!(
            "  Dump: {:02}:{:02}",
            config.schedule.dump_hour, config.schedule.dump_minute
        );
    } else {
        println!("  Disabled");
    }

    println!("\n✓ Configuration is valid");
}
