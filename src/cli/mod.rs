//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::archive::{self, ArchiveLocator};
use crate::config::{Config, Settings};
use crate::crawler::ProfileCrawler;
use crate::http_client::HttpClient;
use crate::models::{FailureReason, VideoRecord, VideoState};
use crate::rate_limit::RateLimiter;
use crate::services::{DownloadConfig, DownloadEvent, DownloadService};

#[derive(Parser)]
#[command(name = "playsrec")]
#[command(about = "Recover plays.tv profile videos from the Wayback Machine")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./playsrec.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Discover a profile's videos without downloading
    Discover {
        /// plays.tv username
        username: String,

        /// Snapshot timestamp for profile pages (overrides config)
        #[arg(long)]
        snapshot: Option<String>,
    },

    /// Discover and download a profile's videos
    Recover {
        /// plays.tv username
        username: String,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Number of download workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Snapshot timestamp for profile pages (overrides config)
        #[arg(long)]
        snapshot: Option<String>,
    },
}

/// Parse arguments, resolve settings and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover()?,
    };
    let mut settings = Settings::from_config(config);

    match cli.command {
        Commands::Discover { username, snapshot } => {
            apply_snapshot_override(&mut settings, snapshot)?;
            cmd_discover(&settings, &username).await
        }
        Commands::Recover {
            username,
            output_dir,
            workers,
            snapshot,
        } => {
            if let Some(output_dir) = output_dir {
                settings.output_dir = output_dir;
            }
            if let Some(workers) = workers {
                settings.workers = workers;
            }
            apply_snapshot_override(&mut settings, snapshot)?;
            cmd_recover(&settings, &username).await
        }
    }
}

/// Validate and apply a `--snapshot` override before any request is made.
fn apply_snapshot_override(
    settings: &mut Settings,
    snapshot: Option<String>,
) -> anyhow::Result<()> {
    if let Some(snapshot) = snapshot {
        if archive::parse_snapshot_timestamp(&snapshot).is_none() {
            anyhow::bail!(
                "invalid snapshot timestamp '{}' (expected YYYYMMDDhhmmss)",
                snapshot
            );
        }
        settings.snapshot = snapshot;
    }
    Ok(())
}

fn build_client(settings: &Settings) -> anyhow::Result<HttpClient> {
    let limiter = Arc::new(RateLimiter::new(settings.rate_limit_config()));
    Ok(HttpClient::new(
        &settings.user_agent,
        settings.request_timeout,
        limiter,
    )?)
}

fn build_locator(settings: &Settings) -> ArchiveLocator {
    ArchiveLocator::new(&settings.snapshot, &settings.module_snapshot)
}

/// Crawl a profile and list what the archive still knows about it.
async fn cmd_discover(settings: &Settings, username: &str) -> anyhow::Result<()> {
    let client = build_client(settings)?;
    let locator = build_locator(settings);

    println!(
        "{} Crawling archived profile for {}",
        style("→").cyan(),
        style(username).bold()
    );

    let state = ProfileCrawler::new(&client, &locator).crawl(username).await?;

    println!(
        "{} Discovered {} videos across {} pages",
        style("✓").green(),
        state.len(),
        state.page_cursor
    );
    for record in state.records() {
        println!("  {} {}", style(&record.id).dim(), record.title);
    }

    Ok(())
}

/// Crawl a profile, then download everything it listed.
async fn cmd_recover(settings: &Settings, username: &str) -> anyhow::Result<()> {
    let client = build_client(settings)?;
    let locator = build_locator(settings);

    println!(
        "{} Crawling archived profile for {}",
        style("→").cyan(),
        style(username).bold()
    );

    let state = ProfileCrawler::new(&client, &locator).crawl(username).await?;
    let discovered = state.len();

    if discovered == 0 {
        println!("{} No videos found for {}", style("!").yellow(), username);
        return Ok(());
    }

    println!(
        "{} Discovered {} videos, downloading to {}",
        style("→").cyan(),
        discovered,
        settings.output_dir.display()
    );

    let service = DownloadService::new(
        Arc::new(client),
        locator,
        DownloadConfig {
            output_dir: settings.output_dir.clone(),
            quality_preference: settings.quality_preference.clone(),
            workers: settings.workers,
        },
    );

    let (event_tx, mut event_rx) = mpsc::channel::<DownloadEvent>(100);

    let progress = ProgressBar::new(discovered as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:30.cyan/dim} {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let display = progress.clone();
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                DownloadEvent::Started { title, .. } => {
                    display.set_message(title);
                }
                DownloadEvent::Completed { .. } | DownloadEvent::AlreadyOnDisk { .. } => {
                    display.inc(1);
                }
                DownloadEvent::Failed { record_id, reason } => {
                    display.println(format!(
                        "{} {}: {}",
                        style("✗").red(),
                        record_id,
                        reason
                    ));
                    display.inc(1);
                }
            }
        }
    });

    let (records, summary) = service.run(state.into_records(), event_tx).await?;

    if let Err(e) = event_handler.await {
        tracing::warn!("event handler task failed: {}", e);
    }
    progress.finish_and_clear();

    println!(
        "{} Downloaded {} videos",
        style("✓").green(),
        summary.downloaded
    );
    if summary.already_present > 0 {
        println!(
            "  {} {} already on disk",
            style("→").dim(),
            summary.already_present
        );
    }
    if summary.failed > 0 {
        println!("  {} {} failed", style("!").yellow(), summary.failed);
        print_failures(&records);
    }

    Ok(())
}

fn print_failures(records: &[VideoRecord]) {
    let no_media = records
        .iter()
        .filter(|r| r.state == VideoState::Failed(FailureReason::NoMedia))
        .count();
    let broken = records
        .iter()
        .filter(|r| r.state == VideoState::Failed(FailureReason::DownloadError))
        .count();

    if no_media > 0 {
        println!("    {} no media available", no_media);
    }
    if broken > 0 {
        println!("    {} download errors", broken);
    }
}
