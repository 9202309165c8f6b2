//! Execution history filters and pagination.

use chrono::{DateTime, Utc};
use harbormaster_auth::EnvironmentId;
use serde::{Deserialize, Serialize};

use crate::execution::{ExecutionRecord, ExecutionStatus, TriggerSource};
use crate::kind::{ScheduleId, ScheduleKind};

/// Default page size.
pub const DEFAULT_LIMIT: usize = 50;

/// Environment filter. `Unscoped` selects records without an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentFilter {
    #[default]
    Any,
    Unscoped,
    Is(EnvironmentId),
}

impl EnvironmentFilter {
    fn matches(&self, env: Option<EnvironmentId>) -> bool {
        match self {
            EnvironmentFilter::Any => true,
            EnvironmentFilter::Unscoped => env.is_none(),
            EnvironmentFilter::Is(id) => env == Some(*id),
        }
    }
}

/// Execution history query. All filters are conjunctive; unset means "any".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionQuery {
    pub schedule_type: Option<ScheduleKind>,
    pub schedule_id: Option<ScheduleId>,
    pub environment: EnvironmentFilter,
    /// Empty matches every status.
    pub statuses: Vec<ExecutionStatus>,
    pub trigger: Option<TriggerSource>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ExecutionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_type(mut self, kind: ScheduleKind) -> Self {
        self.schedule_type = Some(kind);
        self
    }

    pub fn schedule_id(mut self, id: impl Into<ScheduleId>) -> Self {
        self.schedule_id = Some(id.into());
        self
    }

    pub fn environment(mut self, env: EnvironmentId) -> Self {
        self.environment = EnvironmentFilter::Is(env);
        self
    }

    pub fn without_environment(mut self) -> Self {
        self.environment = EnvironmentFilter::Unscoped;
        self
    }

    /// Single status filter.
    pub fn status(mut self, status: ExecutionStatus) -> Self {
        self.statuses = vec![status];
        self
    }

    pub fn statuses(mut self, statuses: impl IntoIterator<Item = ExecutionStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn trigger(mut self, trigger: TriggerSource) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        self.schedule_type.is_none_or(|kind| record.schedule_type == kind)
            && self
                .schedule_id
                .as_ref()
                .is_none_or(|id| &record.schedule_id == id)
            && self.environment.matches(record.environment_id)
            && (self.statuses.is_empty() || self.statuses.contains(&record.status))
            && self.trigger.is_none_or(|t| record.trigger == t)
            && self.from.is_none_or(|from| record.created_at >= from)
            && self.to.is_none_or(|to| record.created_at <= to)
    }

    /// Filter, order newest first and cut one page.
    pub fn apply(&self, records: impl IntoIterator<Item = ExecutionRecord>) -> ExecutionPage {
        let mut matched: Vec<ExecutionRecord> =
            records.into_iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matched.len();
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        let offset = self.offset.unwrap_or(0);
        let records = matched.into_iter().skip(offset).take(limit).collect();

        ExecutionPage {
            records,
            total,
            limit,
            offset,
        }
    }
}

/// One page of execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPage {
    pub records: Vec<ExecutionRecord>,
    /// Matches before pagination.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}
