//! Caller-facing schedule operations: manual triggers, toggles, history.

use std::sync::Arc;

use harbormaster_auth::EnvironmentId;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::SchedulerError;
use crate::execution::{ALREADY_RUNNING, ExecutionId, ExecutionRecord, ExecutionStatus, TriggerSource};
use crate::job::ProgressSender;
use crate::kind::{ScheduleId, ScheduleKey, ScheduleKind, SystemJob};
use crate::query::{DEFAULT_LIMIT, ExecutionPage, ExecutionQuery};
use crate::registry::ScheduleRegistry;

/// Result of a manual or webhook trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<ExecutionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResult {
    /// Map a settled record to the caller-facing result.
    pub fn from_record(record: &ExecutionRecord) -> Self {
        let (success, error) = match record.status {
            ExecutionStatus::Success => (true, None),
            ExecutionStatus::Skipped if record.was_busy() => {
                (false, Some(ALREADY_RUNNING.to_string()))
            }
            ExecutionStatus::Skipped => (true, None),
            ExecutionStatus::Failed => (false, record.error.clone()),
            ExecutionStatus::Queued | ExecutionStatus::Running => {
                (false, Some(format!("execution ended in status {}", record.status)))
            }
        };
        Self {
            success,
            execution_id: Some(record.id),
            status: Some(record.status),
            error,
        }
    }

    /// Rejected before any job body ran.
    pub fn rejected(error: SchedulerError) -> Self {
        Self {
            success: false,
            execution_id: None,
            status: None,
            error: Some(error.to_string()),
        }
    }
}

/// Result of enabling or disabling a schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleResult {
    pub success: bool,
    /// Enabled flag as persisted after the call.
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToggleResult {
    fn rejected(enabled: bool, error: SchedulerError) -> Self {
        Self {
            success: false,
            enabled,
            error: Some(error.to_string()),
        }
    }
}

/// Schedule operations over one registry.
pub struct ScheduleService {
    registry: Arc<ScheduleRegistry>,
    page_limit: usize,
}

impl ScheduleService {
    pub fn new(registry: Arc<ScheduleRegistry>) -> Self {
        Self {
            registry,
            page_limit: DEFAULT_LIMIT,
        }
    }

    /// Page size used when a query sets no limit.
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn registry(&self) -> &Arc<ScheduleRegistry> {
        &self.registry
    }

    /// Arm every enabled schedule.
    pub async fn start(&self) -> Result<usize, SchedulerError> {
        self.registry.rebuild().await
    }

    pub fn shutdown(&self) {
        self.registry.shutdown();
    }

    pub async fn trigger_container_update(&self, id: u64) -> TriggerResult {
        let key = ScheduleKey::new(ScheduleKind::ContainerUpdate, id);
        self.trigger_described(key, TriggerSource::Manual, None).await
    }

    pub async fn trigger_git_stack_sync(&self, id: u64) -> TriggerResult {
        let key = ScheduleKey::new(ScheduleKind::GitStackSync, id);
        self.trigger_described(key, TriggerSource::Manual, None).await
    }

    /// Manual git stack sync streaming progress events to `progress`.
    pub async fn trigger_git_stack_sync_with_progress(
        &self,
        id: u64,
        progress: ProgressSender,
    ) -> TriggerResult {
        let key = ScheduleKey::new(ScheduleKind::GitStackSync, id);
        self.trigger_described(key, TriggerSource::Manual, Some(progress))
            .await
    }

    /// Git stack sync started by a repository webhook.
    pub async fn trigger_git_stack_webhook(&self, id: u64) -> TriggerResult {
        let key = ScheduleKey::new(ScheduleKind::GitStackSync, id);
        self.trigger_described(key, TriggerSource::Webhook, None)
            .await
    }

    pub async fn trigger_system_job(&self, job_id: &str) -> TriggerResult {
        match job_id.parse::<SystemJob>() {
            Ok(job) => self.run(job.key(), None, TriggerSource::Manual, None).await,
            Err(e) => TriggerResult::rejected(e),
        }
    }

    /// Update check for one environment. Needs no descriptor.
    pub async fn trigger_env_update_check(&self, environment_id: EnvironmentId) -> TriggerResult {
        let key = ScheduleKey::new(ScheduleKind::EnvUpdateCheck, environment_id.0);
        self.run(key, Some(environment_id), TriggerSource::Manual, None)
            .await
    }

    /// Persist the enabled flag and arm or disarm the timer to match.
    pub async fn set_schedule_enabled(
        &self,
        kind: ScheduleKind,
        id: ScheduleId,
        enabled: bool,
    ) -> ToggleResult {
        let key = ScheduleKey::new(kind, id);
        let descriptors = self.registry.descriptors();

        let current = match descriptors.get(&key).await {
            Ok(Some(descriptor)) => descriptor.enabled,
            Ok(None) => {
                return ToggleResult::rejected(false, SchedulerError::ScheduleNotFound(key.to_string()));
            }
            Err(e) => return ToggleResult::rejected(false, e),
        };

        if !enabled && !kind.can_disable() {
            return ToggleResult::rejected(
                current,
                SchedulerError::CannotDisableSystemJob(key.id.to_string()),
            );
        }

        match descriptors.set_enabled(&key, enabled).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return ToggleResult::rejected(current, SchedulerError::ScheduleNotFound(key.to_string()));
            }
            Err(e) => return ToggleResult::rejected(current, e),
        }

        let rearmed = if enabled {
            self.registry
                .register_schedule(key.id.clone(), kind, None)
                .await
                .map(|_| ())
        } else {
            self.registry.unregister_schedule(&key.id, kind);
            Ok(())
        };

        match rearmed {
            Ok(()) => {
                info!("Schedule {} {}", key, if enabled { "enabled" } else { "disabled" });
                ToggleResult {
                    success: true,
                    enabled,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Schedule {} enabled but not armed: {}", key, e);
                ToggleResult::rejected(enabled, e)
            }
        }
    }

    /// Execution history. A query without a limit gets the configured page size.
    pub async fn get_schedule_executions(
        &self,
        query: ExecutionQuery,
    ) -> Result<ExecutionPage, SchedulerError> {
        let query = ExecutionQuery {
            limit: query.limit.or(Some(self.page_limit)),
            ..query
        };
        self.registry.executor().store().query(&query).await
    }

    pub async fn get_execution(
        &self,
        id: ExecutionId,
    ) -> Result<Option<ExecutionRecord>, SchedulerError> {
        self.registry.executor().store().get(id).await
    }

    async fn trigger_described(
        &self,
        key: ScheduleKey,
        trigger: TriggerSource,
        progress: Option<ProgressSender>,
    ) -> TriggerResult {
        let descriptor = match self.registry.descriptors().get(&key).await {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                return TriggerResult::rejected(SchedulerError::ScheduleNotFound(key.to_string()));
            }
            Err(e) => return TriggerResult::rejected(e),
        };
        // Manual runs record the same environment as the armed timer would.
        let environment_id = self
            .registry
            .armed_environment(&key)
            .unwrap_or(descriptor.environment_id);
        self.run(key, environment_id, trigger, progress).await
    }

    async fn run(
        &self,
        key: ScheduleKey,
        environment_id: Option<EnvironmentId>,
        trigger: TriggerSource,
        progress: Option<ProgressSender>,
    ) -> TriggerResult {
        match self
            .registry
            .executor()
            .run_with_progress(&key, environment_id, trigger, progress)
            .await
        {
            Ok(record) => TriggerResult::from_record(&record),
            Err(e) => TriggerResult::rejected(e),
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
