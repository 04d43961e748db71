use anyhow::Result;
use clap::Parser;
use snapshotter::config::{self, LOG_LEVELS};
use snapshotter::managers::backup::BackupManager;
use snapshotter::managers::logging::{self, LoggingConfig};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "snapshotter")]
#[command(about = "Backup orchestration for database dumps, metrics snapshots and filesystem archives", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Validate and walk through the run without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Log level, overriding the configuration file
    #[arg(long, ignore_case = true, value_parser = LOG_LEVELS)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_console_logging();
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let logging_config = LoggingConfig::from_settings(
        &config.logging,
        config.log_directory(),
        cli.log_level.as_deref(),
    );

    // A dry run leaves the backup root untouched, log directory included
    let log_guard = if cli.dry_run {
        logging::init_console_logging_at(logging_config.log_level);
        None
    } else {
        Some(logging::init_logging(&logging_config)?)
    };

    let report = BackupManager::new(&config, cli.dry_run).run();

    // Flush file logs before exiting
    drop(log_guard);

    if !report.process_exit_ok {
        std::process::exit(1);
    }

    Ok(())
}
