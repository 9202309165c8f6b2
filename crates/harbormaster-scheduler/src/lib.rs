//! # Harbormaster Scheduler
//!
//! Recurring and manually triggered maintenance jobs with a per-schedule
//! "never overlap" guarantee and a queryable execution history.
//!
//! ## Flow
//!
//! ```text
//! ScheduleRegistry (one timer per enabled (kind, id))
//!   └── fires with trigger "cron" ─┐
//! ScheduleService::trigger_*  ─────┼──► ScheduleExecutor
//!   (trigger "manual"/"webhook")   │      ├── try-acquire guard (busy → skipped)
//!                                  │      ├── record: queued → running
//!                                  │      ├── JobBody for the kind
//!                                  │      └── record: success | failed | skipped
//!                                  └──► ExecutionStore (history + query)
//! ```

pub mod cron_expr;
pub mod descriptor;
pub mod error;
pub mod execution;
pub mod executor;
pub mod guard;
pub mod job;
pub mod kind;
pub mod query;
pub mod registry;
pub mod service;
pub mod store;

pub use descriptor::{DescriptorSource, MemoryDescriptorSource, ScheduleDescriptor};
pub use error::{JobError, SchedulerError};
pub use execution::{ExecutionId, ExecutionRecord, ExecutionStatus, NewExecution, TriggerSource};
pub use executor::ScheduleExecutor;
pub use guard::{GuardTable, ScheduleGuard};
pub use job::{JobBodies, JobBody, JobContext, JobOutcome, ProgressEvent, ProgressSender};
pub use kind::{ScheduleId, ScheduleKey, ScheduleKind, SystemJob};
pub use query::{EnvironmentFilter, ExecutionPage, ExecutionQuery};
pub use registry::ScheduleRegistry;
pub use service::{ScheduleService, ToggleResult, TriggerResult};
pub use store::{ExecutionStore, FileExecutionStore, MemoryExecutionStore};

pub use harbormaster_auth::EnvironmentId;
