//! Harbormaster - authorization engine and maintenance-job scheduler.

mod cli;
mod cmd_auth;
mod cmd_config;
mod cmd_schedule;
mod jobs;

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use clap::Parser;
use harbormaster_config::{Config, ConfigLoader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use cmd_schedule::ExecutionFilters;

/// Keeps the file writer flushing for the life of the process.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Log directory: `logging.dir`, or `<data_dir>/logs`.
fn log_dir(config: &Config) -> PathBuf {
    match &config.logging.dir {
        Some(dir) => ConfigLoader::expand_path(dir),
        None => ConfigLoader::expand_path(&config.scheduler.data_dir).join("logs"),
    }
}

/// Initialize tracing with console output and, when enabled, a daily rolling
/// log file.
///
/// `RUST_LOG` overrides `logging.level`. Console output goes to stderr so
/// JSON printed on stdout stays clean.
fn init_tracing(config: &Config, to_file: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let file_layer = if to_file && config.logging.file {
        let dir = log_dir(config);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("harbormaster")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&dir)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);

        Some(fmt::layer().with_writer(writer).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    // `validate` insists on the file; everything else falls back to defaults.
    let config = match command {
        Commands::Validate => ConfigLoader::load(&cli.config),
        _ => ConfigLoader::load_or_default(&cli.config),
    }
    .with_context(|| format!("failed to load {}", cli.config.display()))?;

    init_tracing(&config, matches!(command, Commands::Run))?;

    match command {
        Commands::Run => cmd_schedule::run(&config).await,
        Commands::Trigger { kind, id, webhook } => {
            cmd_schedule::trigger(&config, &kind, &id, webhook).await
        }
        Commands::Executions {
            kind,
            id,
            env,
            no_env,
            status,
            trigger,
            from,
            to,
            limit,
            offset,
        } => {
            let filters = ExecutionFilters {
                kind,
                id,
                env,
                no_env,
                status,
                trigger,
                from,
                to,
                limit,
                offset,
            };
            cmd_schedule::executions(&config, filters).await
        }
        Commands::Check {
            token,
            resource,
            action,
            env,
        } => cmd_auth::check(&config, token.as_deref(), &resource, &action, env).await,
        Commands::Validate => cmd_config::validate(&config, &cli.config),
    }
}
