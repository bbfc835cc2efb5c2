use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image_extractor::config::{load_config, user_config_path, Config};
use image_extractor::download::{ImageFetcher, ProgressTracker};
use image_extractor::extract::HttpPageSource;
use image_extractor::models::SearchSession;
use image_extractor::ui::{self, DownloadBar, Spinner, Status};
use image_extractor::utils::HttpClient;
use image_extractor::{SessionError, SessionRunner};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Image Extractor - Download images from an image search result feed
#[derive(Parser, Debug)]
#[command(name = "image-extractor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect image URLs from an image search feed and download them", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for images and download them
    #[command(alias = "x")]
    Extract {
        /// Search query
        #[arg(short = 'q', long = "image-query")]
        image_query: String,

        /// Folder receiving the per-query image folder
        #[arg(short = 'f', long = "destination-folder")]
        destination_folder: Option<PathBuf>,

        /// Number of images to download
        #[arg(short = 'n', long = "image-count")]
        image_count: Option<usize>,

        /// Number of download workers
        #[arg(short = 't', long = "thread-count")]
        thread_count: Option<usize>,

        /// Idle paging iterations before giving up on the feed
        #[arg(long)]
        stall_limit: Option<u32>,

        /// Wait after each page request, in milliseconds
        #[arg(long)]
        settle_ms: Option<u64>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Target path (defaults to the per-user config location)
        path: Option<PathBuf>,
    },
}

/// Apply CLI overrides on top of file and environment configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(timeout) = cli.timeout {
        config.downloads.timeout_secs = timeout;
    }

    if let Commands::Extract {
        destination_folder,
        image_count,
        thread_count,
        stall_limit,
        settle_ms,
        ..
    } = &cli.command
    {
        if let Some(dir) = destination_folder {
            config.downloads.destination = dir.clone();
        }
        if let Some(n) = image_count {
            config.downloads.image_count = *n;
        }
        if let Some(t) = thread_count {
            config.downloads.worker_count = *t;
        }
        if let Some(limit) = stall_limit {
            config.search.stall_limit = *limit;
        }
        if let Some(ms) = settle_ms {
            config.search.settle_interval_ms = *ms;
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("image_extractor={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            token.cancel();
        }
    });
}

async fn run_extract(query: &str, config: &Config, quiet: bool) -> Result<(), SessionError> {
    let workers = NonZeroUsize::new(config.downloads.worker_count)
        .ok_or_else(|| SessionError::InvalidSession("thread count must be at least 1".to_string()))?;
    let session = SearchSession::new(query, config.downloads.image_count, workers)
        .ok_or_else(|| SessionError::InvalidSession("image query must not be empty".to_string()))?;

    let client = HttpClient::with_settings(&config.search.user_agent, config.request_timeout())?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let started = Instant::now();
    let spinner = Arc::new(Spinner::new(
        &format!("Retrieving image URLs for \"{}\"", session.query()),
        quiet,
    ));

    let opened = tokio::select! {
        source = HttpPageSource::open(client.clone(), config.search.base_url.clone(), session.query()) => {
            source.map_err(SessionError::from)
        }
        _ = cancel.cancelled() => Err(SessionError::Cancelled("extraction")),
    };
    let source = match opened {
        Ok(source) => source,
        Err(e) => {
            spinner.finish_with_error("Image search unavailable");
            return Err(e);
        }
    };

    let bar = DownloadBar::new(session.target_count(), quiet);
    let tracker = ProgressTracker::new().with_observer(bar.observer());
    let hook_spinner = Arc::clone(&spinner);

    let result = SessionRunner::new(&config.downloads.destination)
        .pager_settings(config.pager_settings())
        .with_tracker(tracker)
        .with_cancellation(cancel)
        .on_extracted(move |extraction| {
            hook_spinner.finish_with_success(&format!(
                "Retrieved {} image URLs",
                extraction.candidates.len()
            ));
        })
        .run(&session, source, |folder, prefix| {
            ImageFetcher::new(client, folder, prefix)
        })
        .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if !spinner.is_finished() {
                spinner.finish_with_error("Extraction failed");
            }
            return Err(e);
        }
    };
    bar.finish();

    if report.cancelled {
        ui::print_status(Status::Warning, "Download cancelled");
    }
    ui::print_report(&report, started.elapsed());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::InitConfig { path } => {
            let path = path
                .clone()
                .or_else(user_config_path)
                .context("No configuration directory available; pass a path")?;
            Config::default()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            ui::print_status(Status::Success, &format!("Wrote {}", path.display()));
        }
        Commands::Extract { image_query, .. } => {
            let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
            apply_overrides(&mut config, &cli);
            tracing::debug!(?config, "Effective configuration");

            run_extract(image_query, &config, cli.quiet || !ui::is_terminal()).await?;
        }
    }

    Ok(())
}
