//! Runs one invocation of a schedule's job body.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use harbormaster_auth::EnvironmentId;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::SchedulerError;
use crate::execution::{ALREADY_RUNNING, ExecutionRecord, NewExecution, TriggerSource};
use crate::guard::GuardTable;
use crate::job::{JobBodies, JobContext, JobOutcome, ProgressSender, streams_progress};
use crate::kind::ScheduleKey;
use crate::store::ExecutionStore;

/// Executes job bodies under the per-schedule guard and records the outcome.
pub struct ScheduleExecutor {
    store: Arc<dyn ExecutionStore>,
    jobs: JobBodies,
    guards: GuardTable,
}

impl ScheduleExecutor {
    pub fn new(store: Arc<dyn ExecutionStore>, jobs: JobBodies) -> Self {
        Self {
            store,
            jobs,
            guards: GuardTable::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ExecutionStore> {
        &self.store
    }

    /// Whether a run of `key` is in flight.
    pub fn is_running(&self, key: &ScheduleKey) -> bool {
        self.guards.is_held(key)
    }

    pub async fn run(
        &self,
        key: &ScheduleKey,
        environment_id: Option<EnvironmentId>,
        trigger: TriggerSource,
    ) -> Result<ExecutionRecord, SchedulerError> {
        self.run_with_progress(key, environment_id, trigger, None)
            .await
    }

    /// Run the job body for `key` once.
    ///
    /// Never blocks on a busy schedule: if another run holds the guard, a
    /// `skipped` record is returned immediately. Job errors and panics end up
    /// on the record as `failed`; only store failures are returned as `Err`.
    /// `progress` is forwarded to git stack sync and dropped for other kinds.
    pub async fn run_with_progress(
        &self,
        key: &ScheduleKey,
        environment_id: Option<EnvironmentId>,
        trigger: TriggerSource,
        progress: Option<ProgressSender>,
    ) -> Result<ExecutionRecord, SchedulerError> {
        let span = info_span!(
            "execution",
            kind = %key.kind,
            id = %key.id,
            env = ?environment_id.map(|e| e.0),
            %trigger,
        );

        self.execute(key, environment_id, trigger, progress)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        key: &ScheduleKey,
        environment_id: Option<EnvironmentId>,
        trigger: TriggerSource,
        progress: Option<ProgressSender>,
    ) -> Result<ExecutionRecord, SchedulerError> {
        let new = NewExecution::new(key.clone(), environment_id, trigger);

        let Some(guard) = self.guards.try_acquire(key) else {
            let mut record = self.store.create(new).await?;
            record.skip(ALREADY_RUNNING)?;
            if let Err(e) = self.store.update(&record).await {
                self.settle_unrecorded(&mut record, &e).await;
                return Err(e);
            }
            info!("Skipped #{}: previous run still in progress", record.id);
            return Ok(record);
        };

        let mut record = self.store.create(new).await?;
        record.start()?;
        if let Err(e) = self.store.update(&record).await {
            error!("Execution #{} could not be marked running: {}", record.id, e);
            self.settle_unrecorded(&mut record, &e).await;
            drop(guard);
            return Err(e);
        }
        debug!("Execution #{} running", record.id);

        let mut ctx = JobContext::new(key.clone(), environment_id, trigger, record.id);
        if let Some(sender) = progress.filter(|_| streams_progress(key.kind)) {
            ctx = ctx.with_progress(sender);
        }

        let body = self.jobs.for_kind(key.kind);
        let outcome = AssertUnwindSafe(body.run(&ctx)).catch_unwind().await;
        drop(ctx);

        match outcome {
            Ok(Ok(JobOutcome::Completed(summary))) => {
                record.succeed(summary)?;
                info!("Execution #{} succeeded", record.id);
            }
            Ok(Ok(JobOutcome::NothingToDo(reason))) => {
                info!("Execution #{} skipped: {}", record.id, reason);
                record.skip(reason)?;
            }
            Ok(Err(e)) => {
                error!("Execution #{} failed: {}", record.id, e);
                record.fail(e.to_string())?;
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Execution #{} panicked: {}", record.id, message);
                record.fail(format!("job panicked: {}", message))?;
            }
        }

        let persisted = self.store.update(&record).await;
        drop(guard);
        if let Err(e) = persisted {
            warn!("Failed to persist outcome of execution #{}: {}", record.id, e);
            return Err(SchedulerError::Store(e.to_string()));
        }
        Ok(record)
    }

    /// Second write after a lost update, so the stored record does not stay
    /// `queued`. A record that never started is failed with the store error.
    async fn settle_unrecorded(&self, record: &mut ExecutionRecord, cause: &SchedulerError) {
        if !record.status.is_terminal() {
            if let Err(e) = record.fail(format!("could not record start: {}", cause)) {
                warn!("Execution #{} left unsettled: {}", record.id, e);
                return;
            }
        }
        if let Err(e) = self.store.update(record).await {
            warn!("Execution #{} left queued in the store: {}", record.id, e);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
