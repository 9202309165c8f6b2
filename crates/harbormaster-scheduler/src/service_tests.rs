//! Tests for the schedule service.

use super::*;
use crate::descriptor::{MemoryDescriptorSource, ScheduleDescriptor};
use crate::error::JobError;
use crate::executor::ScheduleExecutor;
use crate::job::{JobBodies, JobBody, JobContext, JobOutcome};
use crate::store::MemoryExecutionStore;
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Notify, mpsc};

/// Container updates succeed, git sync 13 fails, env checks find nothing.
struct FakeJobs {
    hold: Option<Arc<Notify>>,
}

#[async_trait]
impl JobBody for FakeJobs {
    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        match ctx.key.kind {
            ScheduleKind::ContainerUpdate => Ok(JobOutcome::Completed(json!({"recreated": true}))),
            ScheduleKind::GitStackSync => {
                ctx.progress("pull", "Fetching origin");
                if ctx.key.id == ScheduleId::Numeric(13) {
                    Err(JobError::failed("authentication failed for origin"))
                } else {
                    Ok(JobOutcome::Completed(json!({"commit": "abc123"})))
                }
            }
            ScheduleKind::EnvUpdateCheck => {
                Ok(JobOutcome::NothingToDo("no updates available".to_string()))
            }
            ScheduleKind::SystemCleanup => Ok(JobOutcome::Completed(json!({"removed": 0}))),
        }
    }
}

fn service_with(hold: Option<Arc<Notify>>) -> ScheduleService {
    let source = MemoryDescriptorSource::from_descriptors(
        [
            ScheduleDescriptor::new(ScheduleKind::ContainerUpdate, 12u64, "0 4 * * *")
                .in_environment(EnvironmentId(3)),
            ScheduleDescriptor::new(ScheduleKind::GitStackSync, 7u64, "*/15 * * * *")
                .in_environment(EnvironmentId(1)),
            ScheduleDescriptor::new(ScheduleKind::GitStackSync, 13u64, "*/15 * * * *"),
        ]
        .into_iter()
        .chain(SystemJob::ALL.into_iter().map(ScheduleDescriptor::system)),
    );
    let executor = Arc::new(ScheduleExecutor::new(
        Arc::new(MemoryExecutionStore::new()),
        JobBodies::uniform(Arc::new(FakeJobs { hold })),
    ));
    ScheduleService::new(Arc::new(ScheduleRegistry::new(executor, Arc::new(source))))
}

fn service() -> ScheduleService {
    service_with(None)
}

#[tokio::test]
async fn test_container_update_trigger() {
    let service = service();
    let result = service.trigger_container_update(12).await;
    assert!(result.success);
    assert_eq!(result.status, Some(ExecutionStatus::Success));

    let record = service
        .get_execution(result.execution_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.trigger, TriggerSource::Manual);
    assert_eq!(record.environment_id, Some(EnvironmentId(3)));
}

#[tokio::test]
async fn test_manual_trigger_uses_armed_environment_override() {
    let service = service();
    let key = ScheduleKey::new(ScheduleKind::ContainerUpdate, 12u64);
    service
        .registry()
        .register_schedule(key.id.clone(), key.kind, Some(EnvironmentId(9)))
        .await
        .unwrap();
    assert_eq!(
        service.registry().armed_environment(&key),
        Some(Some(EnvironmentId(9)))
    );

    let result = service.trigger_container_update(12).await;
    let record = service
        .get_execution(result.execution_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.environment_id, Some(EnvironmentId(9)));

    // Once disarmed, the descriptor's environment applies again.
    assert!(service.registry().unregister_schedule(&key.id, key.kind));
    let result = service.trigger_container_update(12).await;
    let record = service
        .get_execution(result.execution_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.environment_id, Some(EnvironmentId(3)));
    service.shutdown();
}

#[tokio::test]
async fn test_unknown_schedule_is_rejected_without_running() {
    let service = service();
    let result = service.trigger_container_update(999).await;
    assert!(!result.success);
    assert!(result.execution_id.is_none());
    assert!(result.error.unwrap().contains("not found"));

    let page = service
        .get_schedule_executions(ExecutionQuery::new())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_job_failure_reported_to_caller() {
    let service = service();
    let result = service.trigger_git_stack_sync(13).await;
    assert!(!result.success);
    assert!(result.execution_id.is_some());
    assert_eq!(result.status, Some(ExecutionStatus::Failed));
    assert_eq!(result.error.as_deref(), Some("authentication failed for origin"));
}

#[tokio::test]
async fn test_webhook_trigger_source() {
    let service = service();
    let result = service.trigger_git_stack_webhook(7).await;
    assert!(result.success);
    let record = service
        .get_execution(result.execution_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.trigger, TriggerSource::Webhook);
}

#[tokio::test]
async fn test_git_sync_progress_stream() {
    let service = service();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = service.trigger_git_stack_sync_with_progress(7, tx).await;
    assert!(result.success);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.stage, "pull");
    assert_eq!(Some(event.execution_id), result.execution_id);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_system_job_trigger() {
    let service = service();
    assert!(service.trigger_system_job("schedule_cleanup").await.success);

    let unknown = service.trigger_system_job("disk_cleanup").await;
    assert!(!unknown.success);
    assert!(unknown.execution_id.is_none());
}

#[tokio::test]
async fn test_env_update_check_nothing_to_do_is_success() {
    let service = service();
    let result = service.trigger_env_update_check(EnvironmentId(4)).await;
    assert!(result.success);
    assert_eq!(result.status, Some(ExecutionStatus::Skipped));

    let page = service
        .get_schedule_executions(ExecutionQuery::new().environment(EnvironmentId(4)))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].schedule_id, ScheduleId::Numeric(4));
}

#[tokio::test]
async fn test_busy_manual_trigger_reports_already_running() {
    let hold = Arc::new(Notify::new());
    let service = Arc::new(service_with(Some(hold.clone())));

    let first = {
        let service = service.clone();
        tokio::spawn(async move { service.trigger_container_update(12).await })
    };
    let key = ScheduleKey::new(ScheduleKind::ContainerUpdate, 12u64);
    while !service.registry().executor().is_running(&key) {
        tokio::task::yield_now().await;
    }

    let second = service.trigger_container_update(12).await;
    assert!(!second.success);
    assert!(second.execution_id.is_some());
    assert_eq!(second.status, Some(ExecutionStatus::Skipped));
    assert_eq!(second.error.as_deref(), Some(ALREADY_RUNNING));

    hold.notify_one();
    assert!(first.await.unwrap().success);
}

#[tokio::test]
async fn test_toggle_arms_and_disarms() {
    let service = service();
    let key = ScheduleKey::new(ScheduleKind::GitStackSync, 7u64);
    service.start().await.unwrap();
    assert!(service.registry().is_armed(&key));

    let off = service
        .set_schedule_enabled(ScheduleKind::GitStackSync, ScheduleId::Numeric(7), false)
        .await;
    assert_eq!(
        off,
        ToggleResult {
            success: true,
            enabled: false,
            error: None
        }
    );
    assert!(!service.registry().is_armed(&key));

    let on = service
        .set_schedule_enabled(ScheduleKind::GitStackSync, ScheduleId::Numeric(7), true)
        .await;
    assert!(on.success && on.enabled);
    assert!(service.registry().is_armed(&key));
}

#[tokio::test]
async fn test_system_cleanup_cannot_be_disabled() {
    let service = service();
    service.start().await.unwrap();
    let key = SystemJob::EventCleanup.key();

    let result = service
        .set_schedule_enabled(ScheduleKind::SystemCleanup, key.id.clone(), false)
        .await;
    assert!(!result.success);
    assert!(result.enabled);
    assert!(result.error.unwrap().contains("cannot be disabled"));
    assert!(service.registry().is_armed(&key));
}

#[tokio::test]
async fn test_toggle_unknown_schedule() {
    let service = service();
    let result = service
        .set_schedule_enabled(ScheduleKind::ContainerUpdate, ScheduleId::Numeric(404), true)
        .await;
    assert!(!result.success);
    assert!(!result.enabled);
}

#[tokio::test]
async fn test_configured_page_limit() {
    let service = service().with_page_limit(2);
    for _ in 0..3 {
        service.trigger_container_update(12).await;
    }

    let page = service
        .get_schedule_executions(ExecutionQuery::new())
        .await
        .unwrap();
    assert_eq!(page.limit, 2);
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.total, 3);

    let explicit = service
        .get_schedule_executions(ExecutionQuery::new().limit(10))
        .await
        .unwrap();
    assert_eq!(explicit.records.len(), 3);
}

#[test]
fn test_trigger_result_json() {
    let rejected = TriggerResult::rejected(SchedulerError::UnknownSystemJob("x".to_string()));
    let value = serde_json::to_value(&rejected).unwrap();
    assert_eq!(value, json!({"success": false, "error": "Unknown system job: 'x'"}));
}
