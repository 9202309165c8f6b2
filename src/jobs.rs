//! Job bodies backed by the local machine.
//!
//! Container update, git stack sync and update checks run the command
//! configured under `[jobs]`; every stdout line becomes a progress event
//! (only delivered for git stack sync). System cleanup prunes old execution
//! history from the store.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use harbormaster_config::{Config, JobCommandConfig};
use harbormaster_scheduler::{
    ExecutionStore, JobBodies, JobBody, JobContext, JobError, JobOutcome, ScheduleKind, SystemJob,
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

/// Assemble the job bodies for a loaded config.
pub(crate) fn job_bodies(config: &Config, store: Arc<dyn ExecutionStore>) -> JobBodies {
    let jobs = &config.jobs;
    JobBodies {
        container_update: Arc::new(CommandJob::new(
            ScheduleKind::ContainerUpdate,
            jobs.container_update.clone(),
        )),
        git_stack_sync: Arc::new(CommandJob::new(
            ScheduleKind::GitStackSync,
            jobs.git_stack_sync.clone(),
        )),
        env_update_check: Arc::new(CommandJob::new(
            ScheduleKind::EnvUpdateCheck,
            jobs.env_update_check.clone(),
        )),
        system_cleanup: Arc::new(CleanupJob::new(store, config.scheduler.retention_days)),
    }
}

/// Runs an external command. Without a command there is nothing to do.
pub(crate) struct CommandJob {
    kind: ScheduleKind,
    command: Option<JobCommandConfig>,
}

impl CommandJob {
    pub(crate) fn new(kind: ScheduleKind, command: Option<JobCommandConfig>) -> Self {
        Self { kind, command }
    }
}

#[async_trait]
impl JobBody for CommandJob {
    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        let Some(config) = &self.command else {
            return Ok(JobOutcome::NothingToDo(format!(
                "no command configured for {}",
                self.kind
            )));
        };

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .env("HARBORMASTER_SCHEDULE_KIND", ctx.key.kind.as_str())
            .env("HARBORMASTER_SCHEDULE_ID", ctx.key.id.to_string())
            .env("HARBORMASTER_TRIGGER", ctx.trigger.as_str())
            .env("HARBORMASTER_EXECUTION_ID", ctx.execution_id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(env) = ctx.environment_id {
            command.env("HARBORMASTER_ENVIRONMENT_ID", env.to_string());
        }

        debug!("Spawning '{}' for {}", config.command, ctx.key);
        let mut child = command.spawn()?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                if let Err(e) = stderr.read_to_string(&mut buf).await {
                    warn!("Failed to read job stderr: {}", e);
                }
            }
            buf
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| JobError::failed("job stdout was not captured"))?;
        let mut lines = LinesStream::new(BufReader::new(stdout).lines());
        let mut line_count = 0usize;
        let mut last_line = None;
        while let Some(line) = lines.next().await {
            let line = line?;
            ctx.progress(self.kind.as_str(), line.clone());
            line_count += 1;
            last_line = Some(line);
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(JobOutcome::Completed(json!({
                "exit_code": status.code(),
                "lines": line_count,
                "last_line": last_line,
            })))
        } else {
            let detail = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|| format!("'{}' exited with {}", config.command, status));
            Err(JobError::failed(detail))
        }
    }
}

/// System cleanup jobs.
///
/// `schedule_cleanup` prunes finished executions older than the retention
/// window. The other system jobs have no local state to clean.
pub(crate) struct CleanupJob {
    store: Arc<dyn ExecutionStore>,
    retention_days: u32,
}

impl CleanupJob {
    pub(crate) fn new(store: Arc<dyn ExecutionStore>, retention_days: u32) -> Self {
        Self {
            store,
            retention_days,
        }
    }
}

#[async_trait]
impl JobBody for CleanupJob {
    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        match SystemJob::from_id(&ctx.key.id) {
            Some(SystemJob::ScheduleCleanup) => {
                let cutoff = Utc::now() - Duration::days(i64::from(self.retention_days));
                let removed = self
                    .store
                    .prune_finished_before(cutoff)
                    .await
                    .map_err(|e| JobError::failed(e.to_string()))?;
                info!("Pruned {} executions finished before {}", removed, cutoff);
                Ok(JobOutcome::Completed(json!({
                    "removed": removed,
                    "cutoff": cutoff,
                })))
            }
            Some(job) => Ok(JobOutcome::NothingToDo(format!(
                "{} has no local state",
                job.as_str()
            ))),
            None => Err(JobError::failed(format!(
                "unknown system job '{}'",
                ctx.key.id
            ))),
        }
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
