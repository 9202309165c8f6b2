//! Execution records and their status state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use harbormaster_auth::EnvironmentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::SchedulerError;
use crate::kind::{ScheduleId, ScheduleKey, ScheduleKind};

/// Skip reason recorded when the per-schedule guard is already held.
pub const ALREADY_RUNNING: &str = "Schedule is already running";

/// Execution id, assigned by the store in creation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ExecutionId(pub u64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What started an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Cron,
    Webhook,
    Manual,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Cron => "cron",
            TriggerSource::Webhook => "webhook",
            TriggerSource::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cron" => Ok(TriggerSource::Cron),
            "webhook" => Ok(TriggerSource::Webhook),
            "manual" => Ok(TriggerSource::Manual),
            other => Err(format!("unknown trigger source: {}", other)),
        }
    }
}

/// Execution status.
///
/// ```text
/// queued ──► running ──► success | failed | skipped
///    └─────────────────► skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Success,
    Failed,
    Skipped,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::Failed | ExecutionStatus::Skipped
        )
    }

    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        matches!(
            (self, next),
            (Queued, Running) | (Queued, Skipped) | (Running, Success | Failed | Skipped)
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "queued" => Ok(ExecutionStatus::Queued),
            "running" => Ok(ExecutionStatus::Running),
            "success" => Ok(ExecutionStatus::Success),
            "failed" => Ok(ExecutionStatus::Failed),
            "skipped" => Ok(ExecutionStatus::Skipped),
            other => Err(format!("unknown execution status: {}", other)),
        }
    }
}

/// Input for [`ExecutionStore::create`](crate::store::ExecutionStore::create).
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub key: ScheduleKey,
    pub environment_id: Option<EnvironmentId>,
    pub trigger: TriggerSource,
}

impl NewExecution {
    pub fn new(key: ScheduleKey, environment_id: Option<EnvironmentId>, trigger: TriggerSource) -> Self {
        Self {
            key,
            environment_id,
            trigger,
        }
    }
}

/// One invocation of a schedule's job body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub schedule_type: ScheduleKind,
    pub schedule_id: ScheduleId,
    #[serde(default)]
    pub environment_id: Option<EnvironmentId>,
    pub trigger: TriggerSource,
    pub status: ExecutionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Job summary, or `{"reason": ...}` for skipped runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// A fresh `queued` record.
    pub fn queued(id: ExecutionId, new: NewExecution, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            schedule_type: new.key.kind,
            schedule_id: new.key.id,
            environment_id: new.environment_id,
            trigger: new.trigger,
            status: ExecutionStatus::Queued,
            created_at,
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    pub fn key(&self) -> ScheduleKey {
        ScheduleKey::new(self.schedule_type, self.schedule_id.clone())
    }

    pub fn start(&mut self) -> Result<(), SchedulerError> {
        self.transition(ExecutionStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn succeed(&mut self, summary: Value) -> Result<(), SchedulerError> {
        self.transition(ExecutionStatus::Success)?;
        self.result = Some(summary);
        self.finish();
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), SchedulerError> {
        self.transition(ExecutionStatus::Failed)?;
        self.error = Some(message.into());
        self.finish();
        Ok(())
    }

    pub fn skip(&mut self, reason: impl Into<String>) -> Result<(), SchedulerError> {
        self.transition(ExecutionStatus::Skipped)?;
        self.result = Some(serde_json::json!({ "reason": reason.into() }));
        self.finish();
        Ok(())
    }

    /// Reason attached to a skipped record.
    pub fn skip_reason(&self) -> Option<&str> {
        if self.status != ExecutionStatus::Skipped {
            return None;
        }
        self.result.as_ref()?.get("reason")?.as_str()
    }

    /// Skipped because another run of the same schedule held the guard.
    pub fn was_busy(&self) -> bool {
        self.skip_reason() == Some(ALREADY_RUNNING)
    }

    fn transition(&mut self, next: ExecutionStatus) -> Result<(), SchedulerError> {
        if !self.status.can_transition_to(next) {
            return Err(SchedulerError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        debug!("Execution #{} {} -> {}", self.id, self.status, next);
        self.status = next;
        Ok(())
    }

    fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
