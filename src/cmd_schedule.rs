//! Schedule subcommand handlers: `run`, `trigger`, `executions`.

use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use harbormaster_config::{Config, ConfigLoader};
use harbormaster_scheduler::{
    EnvironmentId, ExecutionQuery, ExecutionStatus, ExecutionStore, FileExecutionStore,
    MemoryDescriptorSource, ScheduleExecutor, ScheduleId, ScheduleKind, ScheduleRegistry,
    ScheduleService, TriggerResult, TriggerSource,
};
use tokio::sync::mpsc;
use tracing::info;

use crate::jobs::job_bodies;

/// History filters from the command line.
#[derive(Debug, Default)]
pub(crate) struct ExecutionFilters {
    pub kind: Option<String>,
    pub id: Option<String>,
    pub env: Option<u64>,
    pub no_env: bool,
    pub status: Vec<String>,
    pub trigger: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Wire the store, descriptors and job bodies described by `config`.
pub(crate) async fn build_service(config: &Config) -> anyhow::Result<ScheduleService> {
    let data_dir = ConfigLoader::expand_path(&config.scheduler.data_dir);
    let store: Arc<dyn ExecutionStore> = Arc::new(
        FileExecutionStore::open(data_dir.clone())
            .await
            .with_context(|| format!("failed to open execution store in {}", data_dir.display()))?,
    );
    let descriptors = Arc::new(
        MemoryDescriptorSource::from_config(&config.schedules)
            .context("invalid schedule descriptor")?,
    );
    let executor = Arc::new(ScheduleExecutor::new(
        store.clone(),
        job_bodies(config, store),
    ));
    let registry = Arc::new(ScheduleRegistry::new(executor, descriptors));
    Ok(ScheduleService::new(registry).with_page_limit(config.scheduler.page_limit))
}

/// Arm every enabled schedule and run until Ctrl-C.
pub(crate) async fn run(config: &Config) -> anyhow::Result<()> {
    info!("Starting Harbormaster v{}", env!("CARGO_PKG_VERSION"));

    let service = build_service(config).await?;
    let armed = service.start().await?;
    for (key, cron) in service.registry().armed() {
        match service.registry().next_run(&key) {
            Some(next) => info!("  {} '{}' next at {}", key, cron, next),
            None => info!("  {} '{}' has no upcoming run", key, cron),
        }
    }
    info!("Scheduler running with {} armed schedules, press Ctrl-C to stop", armed);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutting down");
    service.shutdown();
    Ok(())
}

/// Run one schedule now and print the result as JSON.
pub(crate) async fn trigger(
    config: &Config,
    kind: &str,
    id: &str,
    webhook: bool,
) -> anyhow::Result<()> {
    let kind: ScheduleKind = kind.parse()?;
    if webhook && kind != ScheduleKind::GitStackSync {
        bail!("--webhook only applies to git_stack_sync");
    }

    let service = build_service(config).await?;
    let result = trigger_kind(&service, kind, id, webhook).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        bail!(
            "{} {} did not succeed: {}",
            kind,
            id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Dispatch a manual trigger. Git progress lines go to stderr as they arrive.
pub(crate) async fn trigger_kind(
    service: &ScheduleService,
    kind: ScheduleKind,
    id: &str,
    webhook: bool,
) -> anyhow::Result<TriggerResult> {
    let result = match kind {
        ScheduleKind::ContainerUpdate => service.trigger_container_update(numeric_id(id)?).await,
        ScheduleKind::GitStackSync if webhook => {
            service.trigger_git_stack_webhook(numeric_id(id)?).await
        }
        ScheduleKind::GitStackSync => {
            let id = numeric_id(id)?;
            let (tx, mut rx) = mpsc::unbounded_channel::<harbormaster_scheduler::ProgressEvent>();
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    eprintln!("[{}] {}", event.stage, event.message);
                }
            });
            let result = service.trigger_git_stack_sync_with_progress(id, tx).await;
            // The sender is gone once the run settles, so this drains and ends.
            let _ = printer.await;
            result
        }
        ScheduleKind::EnvUpdateCheck => {
            service
                .trigger_env_update_check(EnvironmentId(numeric_id(id)?))
                .await
        }
        ScheduleKind::SystemCleanup => service.trigger_system_job(id).await,
    };
    Ok(result)
}

/// Query execution history and print the page as JSON.
pub(crate) async fn executions(config: &Config, filters: ExecutionFilters) -> anyhow::Result<()> {
    let query = build_query(filters)?;
    let service = build_service(config).await?;
    let page = service.get_schedule_executions(query).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

pub(crate) fn build_query(filters: ExecutionFilters) -> anyhow::Result<ExecutionQuery> {
    let mut query = ExecutionQuery::new().offset(filters.offset);
    if let Some(kind) = filters.kind {
        query = query.schedule_type(kind.parse()?);
    }
    if let Some(id) = filters.id {
        query = query.schedule_id(id.parse::<ScheduleId>()?);
    }
    match (filters.env, filters.no_env) {
        (Some(_), true) => bail!("--env and --no-env are mutually exclusive"),
        (Some(env), false) => query = query.environment(EnvironmentId(env)),
        (None, true) => query = query.without_environment(),
        (None, false) => {}
    }
    if filters.from.is_some() || filters.to.is_some() {
        if let (Some(from), Some(to)) = (filters.from, filters.to) {
            if from > to {
                bail!("--from {} is after --to {}", from, to);
            }
        }
        query = query.between(filters.from, filters.to);
    }
    if !filters.status.is_empty() {
        let statuses = filters
            .status
            .iter()
            .map(|s| s.parse::<ExecutionStatus>().map_err(anyhow::Error::msg))
            .collect::<anyhow::Result<Vec<_>>>()?;
        query = query.statuses(statuses);
    }
    if let Some(trigger) = filters.trigger {
        query = query.trigger(trigger.parse::<TriggerSource>().map_err(anyhow::Error::msg)?);
    }
    if let Some(limit) = filters.limit {
        query = query.limit(limit);
    }
    Ok(query)
}

fn numeric_id(id: &str) -> anyhow::Result<u64> {
    id.parse()
        .with_context(|| format!("schedule id '{}' is not numeric", id))
}

#[cfg(test)]
#[path = "cmd_schedule_tests.rs"]
mod tests;
