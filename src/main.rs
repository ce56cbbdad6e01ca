//! # Article Harvester
//!
//! Unattended harvesting of article text from sites described only by a
//! landing-page URL, a link pattern and a content locator.
//!
//! ## Usage
//!
//! ```sh
//! article_harvester sites.json
//! ```
//!
//! ## Architecture
//!
//! One sequential pipeline per site:
//! 1. **Discovery**: fetch the landing page and select article links
//! 2. **Dedup**: claim each URL in the persistent ledger, skipping known ones
//! 3. **Extraction**: fetch the article and pull text from the content blocks
//! 4. **Delivery**: hand the text to the configured sinks (JSON file, text
//!    files, webhook, CMS table)
//!
//! Only an unreadable configuration or an unreachable ledger store stops the
//! process; every per-site and per-article problem is logged and skipped.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod crawler;
mod document;
mod error;
mod fetch;
mod ledger;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use config::load_config;
use crawler::Crawler;
use fetch::Fetcher;
use outputs::Sinks;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("article_harvester starting up");

    let args = Cli::parse();
    debug!(config = %args.config.display(), "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = match load_config(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config.display(), error = %e, "Cannot load configuration");
            return Err(e.into());
        }
    };
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(delay) = args.delay {
        config.request_delay = delay;
    }
    if let Some(password) = args.db_password {
        config.db.password = password;
    }

    // A missing output directory only breaks the file sinks, which log per site.
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(path = %config.output_dir, error = %e, "Output directory is not writable");
    }

    // ---- Persistent store ----
    let store = match ledger::open_store(&config.db).await {
        Ok(store) => store,
        Err(e) => {
            error!(host = %config.db.host, database = %config.db.database, error = %e, "Cannot open ledger store");
            return Err(e.into());
        }
    };

    let fetcher = Fetcher::new()?;
    let sinks = Sinks::from_config(&config, fetcher.client().clone(), store.mysql.clone());
    let crawler = Crawler::new(fetcher, store.ledger, sinks, config.request_delay());

    // ---- Crawl ----
    let reports = crawler.run(&config.sites).await;

    for report in &reports {
        info!(
            site = %report.site,
            discovered = report.discovered,
            selected = report.selected,
            skipped = report.skipped,
            failed = report.failed,
            delivered = report.delivered,
            aborted = report.aborted,
            "Site summary"
        );
    }
    let delivered: usize = reports.iter().map(|r| r.delivered).sum();
    let aborted = reports.iter().filter(|r| r.aborted).count();

    if let Some(pool) = store.mysql {
        pool.close().await;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        sites = reports.len(),
        aborted,
        delivered,
        "Execution complete"
    );

    Ok(())
}
