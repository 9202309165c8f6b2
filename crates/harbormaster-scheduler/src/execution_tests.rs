//! Tests for execution records.

use super::*;
use serde_json::json;

fn record() -> ExecutionRecord {
    ExecutionRecord::queued(
        ExecutionId(1),
        NewExecution::new(
            ScheduleKey::new(ScheduleKind::ContainerUpdate, 12u64),
            Some(EnvironmentId(3)),
            TriggerSource::Manual,
        ),
        Utc::now(),
    )
}

#[test]
fn test_queued_record() {
    let record = record();
    assert_eq!(record.status, ExecutionStatus::Queued);
    assert_eq!(record.key(), ScheduleKey::new(ScheduleKind::ContainerUpdate, 12u64));
    assert!(record.started_at.is_none());
    assert!(record.finished_at.is_none());
}

#[test]
fn test_success_path_sets_timestamps() {
    let mut record = record();
    record.start().unwrap();
    assert!(record.started_at.is_some());
    assert!(record.finished_at.is_none());

    record.succeed(json!({"updated": true})).unwrap();
    assert_eq!(record.status, ExecutionStatus::Success);
    assert!(record.finished_at.is_some());
    assert_eq!(record.result, Some(json!({"updated": true})));
}

#[test]
fn test_failure_stores_message() {
    let mut record = record();
    record.start().unwrap();
    record.fail("pull failed: manifest unknown").unwrap();
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("pull failed: manifest unknown"));
}

#[test]
fn test_queued_can_skip_directly() {
    let mut record = record();
    record.skip(ALREADY_RUNNING).unwrap();
    assert_eq!(record.status, ExecutionStatus::Skipped);
    assert!(record.was_busy());
    assert!(record.started_at.is_none());
    assert!(record.finished_at.is_some());
}

#[test]
fn test_nothing_to_do_skip_is_not_busy() {
    let mut record = record();
    record.start().unwrap();
    record.skip("image already up to date").unwrap();
    assert_eq!(record.skip_reason(), Some("image already up to date"));
    assert!(!record.was_busy());
}

#[test]
fn test_invalid_transitions_rejected() {
    let mut record = record();
    assert!(matches!(
        record.succeed(json!(null)),
        Err(SchedulerError::InvalidTransition { .. })
    ));
    assert!(record.fail("nope").is_err());

    record.start().unwrap();
    assert!(record.start().is_err());

    record.succeed(json!({})).unwrap();
    for result in [
        record.clone().start(),
        record.clone().fail("late"),
        record.clone().skip("late"),
        record.clone().succeed(json!({})),
    ] {
        assert!(matches!(result, Err(SchedulerError::InvalidTransition { .. })));
    }
    // The failed attempt left the record untouched.
    assert_eq!(record.status, ExecutionStatus::Success);
}

#[test]
fn test_transition_table() {
    use ExecutionStatus::*;
    let all = [Queued, Running, Success, Failed, Skipped];
    let allowed = [
        (Queued, Running),
        (Queued, Skipped),
        (Running, Success),
        (Running, Failed),
        (Running, Skipped),
    ];
    for from in all {
        for to in all {
            assert_eq!(
                from.can_transition_to(to),
                allowed.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
    assert!(!Queued.is_terminal());
    assert!(Skipped.is_terminal());
}

#[test]
fn test_record_json_shape() {
    let mut record = record();
    record.start().unwrap();
    record.fail("boom").unwrap();

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["schedule_type"], "container_update");
    assert_eq!(value["schedule_id"], 12);
    assert_eq!(value["environment_id"], 3);
    assert_eq!(value["trigger"], "manual");
    assert_eq!(value["status"], "failed");
    assert!(value.get("result").is_none());

    let parsed: ExecutionRecord = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, record);
}
