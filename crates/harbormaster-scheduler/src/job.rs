//! Job bodies.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harbormaster_auth::EnvironmentId;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::JobError;
use crate::execution::{ExecutionId, TriggerSource};
use crate::kind::{ScheduleKey, ScheduleKind};

/// A progress line from a running job. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub execution_id: ExecutionId,
    pub stage: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Sending half of a progress stream.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// What a job body sees of its invocation.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub key: ScheduleKey,
    pub environment_id: Option<EnvironmentId>,
    pub trigger: TriggerSource,
    pub execution_id: ExecutionId,
    progress: Option<ProgressSender>,
}

impl JobContext {
    pub fn new(
        key: ScheduleKey,
        environment_id: Option<EnvironmentId>,
        trigger: TriggerSource,
        execution_id: ExecutionId,
    ) -> Self {
        Self {
            key,
            environment_id,
            trigger,
            execution_id,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn has_progress(&self) -> bool {
        self.progress.is_some()
    }

    /// Emit a progress event. Dropped silently when nobody listens.
    pub fn progress(&self, stage: impl Into<String>, message: impl Into<String>) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(ProgressEvent {
                execution_id: self.execution_id,
                stage: stage.into(),
                message: message.into(),
                at: Utc::now(),
            });
        }
    }
}

/// How a job body finished.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Work done; the value is a short summary stored on the record.
    Completed(Value),
    /// Nothing to do; recorded as skipped with this reason.
    NothingToDo(String),
}

/// The work behind one schedule kind.
#[async_trait]
pub trait JobBody: Send + Sync {
    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError>;
}

/// One body per schedule kind.
#[derive(Clone)]
pub struct JobBodies {
    pub container_update: Arc<dyn JobBody>,
    pub git_stack_sync: Arc<dyn JobBody>,
    pub env_update_check: Arc<dyn JobBody>,
    pub system_cleanup: Arc<dyn JobBody>,
}

impl JobBodies {
    pub fn for_kind(&self, kind: ScheduleKind) -> Arc<dyn JobBody> {
        match kind {
            ScheduleKind::ContainerUpdate => self.container_update.clone(),
            ScheduleKind::GitStackSync => self.git_stack_sync.clone(),
            ScheduleKind::EnvUpdateCheck => self.env_update_check.clone(),
            ScheduleKind::SystemCleanup => self.system_cleanup.clone(),
        }
    }

    /// Same body for every kind.
    pub fn uniform(body: Arc<dyn JobBody>) -> Self {
        Self {
            container_update: body.clone(),
            git_stack_sync: body.clone(),
            env_update_check: body.clone(),
            system_cleanup: body,
        }
    }
}

/// Only git stack sync streams progress.
pub fn streams_progress(kind: ScheduleKind) -> bool {
    matches!(kind, ScheduleKind::GitStackSync)
}
