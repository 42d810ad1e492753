//! Shelfwatch CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shelfwatch::{
    error::Result,
    models::{ALL_SPECIALS, Config, Target},
    pipeline::{self, Datasets},
    storage::{DatasetStorage, LocalStorage},
};
use tokio_util::sync::CancellationToken;

/// Environment variable holding a pre-captured cookie.
const COOKIE_ENV: &str = "SHELFWATCH_COOKIE";

/// Shelfwatch - supermarket listing scraper
#[derive(Parser, Debug)]
#[command(name = "shelfwatch", version, about = "Resilient supermarket listing scraper")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "shelfwatch.toml")]
    config: PathBuf,

    /// Dataset directory (overrides storage.root)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape listings and merge them into the dataset
    Crawl {
        /// Browse category to scrape instead of the configured targets (repeatable)
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Scrape the specials listing, optionally narrowed by a special type
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        specials: Option<String>,

        /// Override pagination.max_pages
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Rebuild the processed datasets (products and configured discount sets)
    Process,

    /// Summarize savings in discount sets
    Discounts {
        /// Discount sets to summarize (default: the configured specials filters)
        sets: Vec<String>,
    },

    /// Read product detail pages
    Product {
        /// Product page URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Write the details as JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// Show dataset info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Targets chosen on the command line, or the configured ones.
fn select_targets(config: &Config, targets: Vec<String>, specials: Option<String>) -> Vec<Target> {
    let mut selected: Vec<Target> = targets.into_iter().map(Target::browse).collect();
    if let Some(filter) = specials {
        selected.push(Target::specials(Some(filter.as_str()).filter(|f| !f.is_empty())));
    }
    if selected.is_empty() {
        config.targets.clone()
    } else {
        selected
    }
}

/// Discount sets named by the configured specials targets.
fn configured_discount_sets(config: &Config) -> Vec<String> {
    let mut sets: Vec<String> = Vec::new();
    for set in config.targets.iter().filter_map(Target::discount_set) {
        if !sets.iter().any(|s| s == set) {
            sets.push(set.to_string());
        }
    }
    sets
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_interrupt(token: &CancellationToken) {
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received; finishing the current page");
            on_signal.cancel();
        }
    });
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        log::warn!("{} not found, using defaults", cli.config.display());
        Config::default()
    };
    if let Some(dir) = cli.data_dir {
        config.storage.root = dir;
    }
    if let Ok(cookie) = std::env::var(COOKIE_ENV) {
        if !cookie.trim().is_empty() {
            log::info!("Using cookie from {COOKIE_ENV} ({} chars)", cookie.len());
            config.credential.cookie = Some(cookie);
        }
    }

    let storage = LocalStorage::new(&config.storage.root);

    match cli.command {
        Command::Crawl {
            targets,
            specials,
            max_pages,
        } => {
            if let Some(max_pages) = max_pages {
                config.pagination.max_pages = max_pages;
            }
            config.validate()?;

            let targets = select_targets(&config, targets, specials);
            let datasets = Datasets::local(&storage, &targets)?;

            let cancel = CancellationToken::new();
            cancel_on_interrupt(&cancel);

            let report = pipeline::run_crawler(&config, &targets, &datasets, &cancel).await?;

            if report.was_cancelled() {
                log::warn!("Crawl cancelled; {} records merged", report.total_records());
            } else {
                log::info!("Crawl complete!");
            }
        }

        Command::Process => {
            let count = pipeline::run_process(&storage).await?;
            log::info!(
                "Processed dataset written to {} ({} rows)",
                storage.processed_path().display(),
                count
            );
            for set in configured_discount_sets(&config) {
                let discounts = storage.discounts(&set);
                let count = pipeline::run_process(&discounts).await?;
                log::info!(
                    "Processed discounts '{set}' written to {} ({} rows)",
                    discounts.processed_path().display(),
                    count
                );
            }
        }

        Command::Discounts { sets } => {
            let mut sets = if sets.is_empty() {
                configured_discount_sets(&config)
            } else {
                sets
            };
            if sets.is_empty() {
                sets.push(ALL_SPECIALS.to_string());
            }
            for set in sets {
                pipeline::run_discount_summary(&set, &storage.discounts(&set)).await?;
            }
        }

        Command::Product { urls, output } => {
            config.validate()?;

            let cancel = CancellationToken::new();
            cancel_on_interrupt(&cancel);

            let report = pipeline::run_product_details(&config, &urls, &cancel).await?;
            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    log::info!("Product details written to {}", path.display());
                }
                None => println!("{json}"),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "Config OK: {} targets, {} seed urls, {} block markers",
                config.targets.len(),
                config.credential.seed_urls.len(),
                config.detection.block_markers.len()
            );
        }

        Command::Info => {
            log::info!("Dataset directory: {}", storage.root().display());

            let current = storage.load_current().await?;
            let archive = storage.load_archive().await?;
            let processed = storage.load_processed().await?;

            log::info!("Current rows: {}", current.len());
            log::info!("Archived rows: {}", archive.len());
            log::info!("Processed rows: {}", processed.len());

            if let Some(latest) = current.iter().map(|row| row.timestamp).max() {
                log::info!("Last scrape: {}", latest);
            } else {
                log::info!("No data yet. Run 'crawl' first.");
            }

            for set in configured_discount_sets(&config) {
                let discounts = storage.discounts(&set);
                log::info!(
                    "Discounts '{set}': {} current, {} archived",
                    discounts.load_current().await?.len(),
                    discounts.load_archive().await?.len()
                );
            }
        }
    }

    Ok(())
}
