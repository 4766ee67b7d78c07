//! incr-backup - Main entry point
//!
//! Incremental file backup to a local or mounted network destination.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use incr_backup::config::{self, Config};
use incr_backup::daemon::shutdown::ShutdownCoordinator;
use incr_backup::fs::destination::{describe_path_type, validate_destination};
use incr_backup::fs::walker::Scanner;
use incr_backup::sync::detector::SizeDetector;
use incr_backup::transfer::copier::LocalCopier;
use incr_backup::transfer::progress::format_bytes;
use incr_backup::{utils, BackupExecutor, BackupJob, BackupState};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: ~/.config/incr-backup/config.json)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a backup
    Backup {
        /// Show how many files would be backed up without copying
        #[arg(long)]
        dry_run: bool,
    },
    /// Show last backup time, file count and total size
    Status,
    /// Show the current configuration (file merged with environment)
    Config,
    /// Generate a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };

    // `init` must work even when the existing file is broken.
    let config = match &args.command {
        Command::Init { .. } => Config::default(),
        _ => Config::load_from(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?,
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    match args.command {
        Command::Backup { dry_run: true } => dry_run(&config),
        Command::Backup { dry_run: false } => backup(config).await,
        Command::Status => status(),
        Command::Config => {
            println!("{config}");
            Ok(())
        }
        Command::Init { force } => init(&config_path, force),
    }
}

fn dry_run(config: &Config) -> Result<()> {
    if !has_paths(config) {
        return Ok(());
    }

    tracing::info!("running dry-run scan");
    let scanner = Scanner::new(&config.files_to_ignore_patterns);
    let files = scanner
        .scan_dry_run(&config.paths_to_backup)
        .context("scan failed")?;

    println!("\nFound {} files that would be backed up", files.len());
    Ok(())
}

async fn backup(config: Config) -> Result<()> {
    if !has_paths(&config) {
        return Ok(());
    }

    tracing::info!(
        backup_root = %config.backup_root.display(),
        kind = describe_path_type(&config.backup_root),
        "validating destination"
    );
    validate_destination(&config.backup_root)?;

    let state_path = config::default_state_path()?;
    let state = BackupState::load_from(&state_path).context("failed to load state")?;

    let coordinator = ShutdownCoordinator::new();
    let token = coordinator.token();

    let signal_coordinator = coordinator.clone();
    let signal_task = tokio::spawn(async move {
        if let Err(e) = signal_coordinator.wait_for_signal().await {
            tracing::warn!("Failed to install signal handlers: {}", e);
        }
    });

    let job = BackupJob {
        paths: config.paths_to_backup.clone(),
        destination: config.backup_root.clone(),
    };
    let mut executor = BackupExecutor::new(
        Scanner::with_cancel(&config.files_to_ignore_patterns, token.clone()),
        Box::new(SizeDetector::new()),
        Box::new(LocalCopier::new()),
        state,
        state_path,
        config.device_id.clone(),
    )
    .with_cancel(token);

    let outcome = tokio::task::spawn_blocking(move || executor.execute(&job)).await;
    signal_task.abort();

    let result = outcome.context("backup task panicked")??;
    println!("Backup finished: {result}");

    if result.interrupted {
        bail!("backup interrupted; state saved for files copied so far");
    }
    Ok(())
}

fn status() -> Result<()> {
    let state = BackupState::load_from(&config::default_state_path()?)
        .context("failed to load state")?;

    println!("Backup Status:");
    println!();
    match state.last_run {
        Some(last_run) => println!(
            "  Last backup: {}",
            last_run.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("  Last backup: Never"),
    }
    println!("  Files backed up: {}", state.file_count());
    if state.file_count() > 0 {
        let total = state.total_size();
        println!("  Total size: {} bytes ({})", total, format_bytes(total));
    }
    Ok(())
}

fn init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "config file already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    Config::default().save_to(config_path)?;
    println!("Created default config at: {}", config_path.display());
    println!("\nEdit this file to configure your backup settings.");
    Ok(())
}

fn has_paths(config: &Config) -> bool {
    if config.paths_to_backup.is_empty() {
        tracing::warn!("no paths configured for backup");
        println!("Please configure paths to backup in the config file.");
        println!("Run 'incr-backup init' to create a default config file.");
        return false;
    }
    true
}
