//! repowatch - upstream-divergence watcher
//!
//! CLI entry point: one-shot checks, log/pull actions, and the foreground
//! watch loop.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use eyre::{Context, Result, eyre};
use tokio::sync::mpsc;
use tracing::info;

use repowatch::cli::{Cli, Command, OutputFormat};
use repowatch::collab::{GitLogView, PullChoice, PullPrompt, StdinPrompt};
use repowatch::config::{Config, RepoHandle};
use repowatch::coordinator::{CheckOutcome, FetchCoordinator, PullOutcome, StatusEvent};
use repowatch::divergence::Evaluator;
use repowatch::gateway::{GitGateway, VcsGateway};
use repowatch::reporter;
use repowatch::scheduler::Scheduler;

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("repowatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to the log file, not stdout - stdout is for command output
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("repowatch.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

/// Everything a command needs: gateway and coordinator over the resolved
/// repository handle, plus the status channel receiver.
struct Runtime {
    gateway: Arc<dyn VcsGateway>,
    coordinator: Arc<FetchCoordinator>,
    status_rx: mpsc::Receiver<StatusEvent>,
}

async fn build_runtime(config: &Config) -> Runtime {
    let handle = RepoHandle::resolve(config.repo.as_deref()).await;
    info!(repo = %handle.path().display(), "Tracking repository");

    let gateway: Arc<dyn VcsGateway> = Arc::new(GitGateway::new(handle.path()));
    let log_view = Arc::new(GitLogView::new(gateway.clone(), config.remote.clone()));

    let (status_tx, status_rx) = mpsc::channel(16);
    let coordinator = Arc::new(FetchCoordinator::new(
        gateway.clone(),
        log_view,
        config.remote.clone(),
        config.fetch_poll_interval(),
        status_tx,
    ));

    Runtime {
        gateway,
        coordinator,
        status_rx,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Some(Command::Check) => cmd_check(&config).await,
        Some(Command::Log) => cmd_log(&config).await,
        Some(Command::Pull { confirm }) => cmd_pull(&config, confirm).await,
        Some(Command::Status { format }) => cmd_status(&config, format).await,
        Some(Command::Watch) => cmd_watch(&config).await,
        None => {
            // Default action is a one-shot check
            cmd_check(&config).await
        }
    }
}

/// Check for updates now; failures are visible on an interactive check.
async fn cmd_check(config: &Config) -> Result<()> {
    let rt = build_runtime(config).await;

    match rt.coordinator.check_for_updates().await? {
        CheckOutcome::Completed(divergence) => {
            println!("{}", reporter::render(divergence.as_count()));
            Ok(())
        }
        CheckOutcome::FetchFailed => Err(eyre!("fetch from {} failed; see the log for details", config.remote)),
        CheckOutcome::Skipped => Err(eyre!("a fetch is already in flight")),
    }
}

async fn cmd_log(config: &Config) -> Result<()> {
    let rt = build_runtime(config).await;
    rt.coordinator.pull(false).await?;
    Ok(())
}

async fn cmd_pull(config: &Config, confirm: bool) -> Result<()> {
    let rt = build_runtime(config).await;

    let confirm = confirm || matches!(StdinPrompt.choose()?, PullChoice::Update);

    match rt.coordinator.pull(confirm).await? {
        PullOutcome::Updated => println!("Local branch updated to match upstream."),
        PullOutcome::LogShown => {}
    }
    Ok(())
}

/// Evaluate and print divergence without fetching first.
async fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    let rt = build_runtime(config).await;

    let evaluator = Evaluator::new(rt.gateway.clone(), config.remote.clone());
    let divergence = evaluator.evaluate().await?;
    let count = divergence.as_count();

    match format {
        OutputFormat::Text => println!("{}", reporter::render(count)),
        OutputFormat::Json => {
            let event = StatusEvent {
                divergence,
                count,
                message: reporter::render(count),
                checked_at: Utc::now(),
            };
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }
    Ok(())
}

/// Run the automatic check timer in the foreground until ctrl-c.
async fn cmd_watch(config: &Config) -> Result<()> {
    let Runtime {
        coordinator,
        mut status_rx,
        ..
    } = build_runtime(config).await;

    // Print each status update as it arrives
    let printer = tokio::spawn(async move {
        while let Some(event) = status_rx.recv().await {
            println!("[{}] {}", event.checked_at.format("%H:%M:%S"), event.message);
        }
    });

    let interval = config.fetch_interval.as_duration()?;
    let scheduler = Scheduler::new(coordinator, interval);

    if config.auto_check {
        scheduler.enable().await;
        println!("Watching for upstream updates every {interval:?} (ctrl-c to stop)");
    } else {
        println!("auto-check is disabled in the configuration; nothing to do");
        return Ok(());
    }

    tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;

    scheduler.disable().await;
    printer.abort();
    println!("Stopped.");
    Ok(())
}
