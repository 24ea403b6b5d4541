use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelbatch_core::{
    extract_archives, load_config, load_config_from_env, metrics, validate_config,
    AdvanceOutcome, BatchDriver, BatchStatus, CommandFetcher, Config, ContentFetcher,
    FetcherBackend, HttpFetcher, PrepareOutcome, TokioSleeper,
};

/// Resumable batch retrieval of media links.
#[derive(Debug, Parser)]
#[command(name = "reelbatch", version)]
struct Cli {
    /// TOML config file; defaults plus REELBATCH_* variables when omitted
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Show batch progress over the link registry
    Status,
    /// Copy the current batch into the working set
    Prepare,
    /// Move the cursor to the next batch
    Advance,
    /// Prepare and process the current batch
    Run,
    /// Unpack zip archives into the final store
    Extract,
}

#[tokio::main]
async fn main() {
    // Usage errors exit with status 2
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> Result<()> {
    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_config_from_env().context("Failed to load config from environment")?,
    };
    validate_config(&config).context("Invalid configuration")?;

    let result = dispatch(&args, &config).await;

    if let Some(path) = &config.metrics.textfile {
        if let Err(e) = metrics::write_textfile(path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    result
}

async fn dispatch(args: &Cli, config: &Config) -> Result<()> {
    match args.command {
        Command::Status => {
            let status = build_driver(config)?.status()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
        Command::Prepare => {
            let driver = build_driver(config)?;
            print_status(&driver.status()?);
            match driver.prepare()? {
                PrepareOutcome::Prepared(batch) => {
                    let (first, last) = batch.line_range();
                    println!(
                        "Prepared batch {} (lines {}-{} of {}) into {}",
                        batch.batch,
                        first,
                        last,
                        batch.total_links,
                        config.paths.working_set.display()
                    );
                }
                PrepareOutcome::NoMoreWork { batch } => {
                    println!("Batch {batch} has no remaining links; all batches processed");
                }
            }
        }
        Command::Advance => match build_driver(config)?.advance()? {
            AdvanceOutcome::Advanced { to } => println!("Advanced to batch {to}"),
            AdvanceOutcome::Exhausted { batch, total_links } => println!(
                "All {total_links} links processed; cursor stays on batch {batch}"
            ),
        },
        Command::Run => {
            let driver = build_driver(config)?;
            print_status(&driver.status()?);
            let report = tokio::select! {
                report = driver.run_current_batch() => report?,
                _ = shutdown_signal() => {
                    bail!("Interrupted; rerun to resume the current batch");
                }
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
            info!(batch = report.batch, phase = %report.phase, "Run finished");
        }
        Command::Extract => {
            let report = extract_archives(
                &config.paths.archives_dir,
                &config.paths.final_store,
                &config.triage.extension,
            )
            .await
            .context("Archive extraction failed")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Extracted {} file(s) from {} archive(s), {} already present",
                    report.extracted, report.archives, report.skipped_existing
                );
                for name in &report.failed_archives {
                    println!("  FAILED {name}");
                }
            }
        }
    }

    Ok(())
}

fn build_driver(config: &Config) -> Result<BatchDriver> {
    Ok(BatchDriver::from_config(
        config,
        build_fetcher(config)?,
        Arc::new(TokioSleeper),
    ))
}

fn build_fetcher(config: &Config) -> Result<Arc<dyn ContentFetcher>> {
    let fetcher: Arc<dyn ContentFetcher> = match config.fetcher.backend {
        FetcherBackend::Http => {
            let http = &config.fetcher.http;
            Arc::new(
                HttpFetcher::new(Duration::from_secs(http.timeout_secs), &http.user_agent)
                    .context("Failed to build HTTP client")?,
            )
        }
        FetcherBackend::Command => {
            let command = &config.fetcher.command;
            let program = command
                .program
                .clone()
                .context("fetcher.command.program is required for the command backend")?;
            Arc::new(CommandFetcher::new(
                program,
                command.args.clone(),
                Duration::from_secs(command.timeout_secs),
            ))
        }
    };
    info!(fetcher = fetcher.name(), "Fetcher ready");
    Ok(fetcher)
}

fn print_status(status: &BatchStatus) {
    println!("==============================");
    println!("BATCH PROCESSING STATUS");
    println!("==============================");
    println!(
        "Current batch:    {} of {}",
        status.current_batch, status.total_batches
    );
    println!("Total links:      {}", status.total_links);
    println!("Links processed:  {}", status.links_processed);
    println!("Links remaining:  {}", status.links_remaining);
    println!("Annotated links:  {}", status.annotated_links);
    println!("Batch size:       {}", status.batch_size);
    println!("Progress:         {:.1}%", status.percent_complete);
    println!("==============================");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
