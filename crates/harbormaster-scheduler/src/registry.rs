//! ScheduleRegistry - one live cron timer per enabled schedule.
//!
//! Each armed schedule owns a spawned task that sleeps until the next cron
//! instant and then hands the run to [`ScheduleExecutor`] on its own task, so
//! a long run never delays cancellation or the next firing. Cancelling a
//! timer only prevents future firings; in-flight runs finish normally.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use harbormaster_auth::EnvironmentId;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cron_expr;
use crate::descriptor::DescriptorSource;
use crate::error::SchedulerError;
use crate::execution::TriggerSource;
use crate::executor::ScheduleExecutor;
use crate::kind::{ScheduleId, ScheduleKey, ScheduleKind};

/// Runtime-only state for one armed schedule.
struct ArmedTimer {
    /// Cron expression as configured (for display).
    cron: String,
    schedule: Schedule,
    /// Environment the timer runs under, override included.
    environment_id: Option<EnvironmentId>,
    token: CancellationToken,
}

/// Owns the armed timers.
pub struct ScheduleRegistry {
    executor: Arc<ScheduleExecutor>,
    descriptors: Arc<dyn DescriptorSource>,
    timers: Mutex<HashMap<ScheduleKey, ArmedTimer>>,
    /// Parent of every timer token.
    shutdown: CancellationToken,
}

impl ScheduleRegistry {
    pub fn new(executor: Arc<ScheduleExecutor>, descriptors: Arc<dyn DescriptorSource>) -> Self {
        Self {
            executor,
            descriptors,
            timers: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn executor(&self) -> &Arc<ScheduleExecutor> {
        &self.executor
    }

    pub fn descriptors(&self) -> &Arc<dyn DescriptorSource> {
        &self.descriptors
    }

    /// Arm (or re-arm) the timer for (kind, id) from its descriptor.
    ///
    /// Returns `Ok(false)` when the descriptor is disabled; any existing timer
    /// is disarmed in that case. `environment_id` overrides the descriptor's.
    pub async fn register_schedule(
        &self,
        id: ScheduleId,
        kind: ScheduleKind,
        environment_id: Option<EnvironmentId>,
    ) -> Result<bool, SchedulerError> {
        let key = ScheduleKey::new(kind, id);
        let descriptor = self
            .descriptors
            .get(&key)
            .await?
            .ok_or_else(|| SchedulerError::ScheduleNotFound(key.to_string()))?;

        if !descriptor.enabled && kind.can_disable() {
            if self.disarm(&key) {
                debug!("Descriptor {} disabled, timer removed", key);
            }
            return Ok(false);
        }

        let schedule = cron_expr::parse(&descriptor.cron)?;
        if self.shutdown.is_cancelled() {
            warn!("Registry shut down, not arming {}", key);
            return Ok(false);
        }

        let environment_id = environment_id.or(descriptor.environment_id);
        self.arm(key, descriptor.cron, schedule, environment_id);
        Ok(true)
    }

    /// Cancel and remove the timer for (kind, id). Returns whether one was armed.
    pub fn unregister_schedule(&self, id: &ScheduleId, kind: ScheduleKind) -> bool {
        self.disarm(&ScheduleKey::new(kind, id.clone()))
    }

    /// Arm every enabled descriptor. Failures are logged and skipped.
    pub async fn rebuild(&self) -> Result<usize, SchedulerError> {
        let descriptors = self.descriptors.list_enabled().await?;
        let mut armed = 0;
        for descriptor in descriptors {
            let key = descriptor.key();
            match self
                .register_schedule(descriptor.id, descriptor.kind, descriptor.environment_id)
                .await
            {
                Ok(true) => armed += 1,
                Ok(false) => {}
                Err(e) => warn!("Failed to arm {}: {}", key, e),
            }
        }
        info!("Armed {} schedules", armed);
        Ok(armed)
    }

    /// Cancel every timer. Registering afterwards arms nothing.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let count = self.timers.lock().drain().count();
        info!("Schedule registry shut down ({} timers cancelled)", count);
    }

    /// Armed keys with their cron expressions, sorted by key.
    pub fn armed(&self) -> Vec<(ScheduleKey, String)> {
        let mut armed: Vec<_> = self
            .timers
            .lock()
            .iter()
            .map(|(key, timer)| (key.clone(), timer.cron.clone()))
            .collect();
        armed.sort();
        armed
    }

    pub fn armed_cron(&self, key: &ScheduleKey) -> Option<String> {
        self.timers.lock().get(key).map(|t| t.cron.clone())
    }

    /// Environment an armed schedule fires under. `None` when not armed.
    pub fn armed_environment(&self, key: &ScheduleKey) -> Option<Option<EnvironmentId>> {
        self.timers.lock().get(key).map(|t| t.environment_id)
    }

    pub fn is_armed(&self, key: &ScheduleKey) -> bool {
        self.timers.lock().contains_key(key)
    }

    /// Next firing of an armed schedule.
    pub fn next_run(&self, key: &ScheduleKey) -> Option<DateTime<Utc>> {
        let timers = self.timers.lock();
        cron_expr::next_after(&timers.get(key)?.schedule, Utc::now())
    }

    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }

    fn arm(
        &self,
        key: ScheduleKey,
        cron: String,
        schedule: Schedule,
        environment_id: Option<EnvironmentId>,
    ) {
        let mut timers = self.timers.lock();
        if let Some(previous) = timers.remove(&key) {
            previous.token.cancel();
            debug!("Cancelled previous timer for {} ('{}')", key, previous.cron);
        }

        let token = self.shutdown.child_token();
        tokio::spawn(run_timer(
            key.clone(),
            schedule.clone(),
            environment_id,
            token.clone(),
            self.executor.clone(),
        ));

        info!("Armed {} with '{}'", key, cron);
        timers.insert(
            key,
            ArmedTimer {
                cron,
                schedule,
                environment_id,
                token,
            },
        );
    }

    fn disarm(&self, key: &ScheduleKey) -> bool {
        match self.timers.lock().remove(key) {
            Some(timer) => {
                timer.token.cancel();
                info!("Disarmed {}", key);
                true
            }
            None => false,
        }
    }
}

impl Drop for ScheduleRegistry {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_timer(
    key: ScheduleKey,
    schedule: Schedule,
    environment_id: Option<EnvironmentId>,
    token: CancellationToken,
    executor: Arc<ScheduleExecutor>,
) {
    let mut after = Utc::now();
    loop {
        let Some(next) = cron_expr::next_after(&schedule, after) else {
            debug!("No upcoming firing for {}", key);
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            _ = token.cancelled() => {
                debug!("Timer for {} cancelled", key);
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        // Missed instants (suspend, clock jump) are not replayed.
        after = next.max(Utc::now());

        let executor = executor.clone();
        let key = key.clone();
        tokio::spawn(async move {
            debug!("Timer fired for {}", key);
            if let Err(e) = executor.run(&key, environment_id, TriggerSource::Cron).await {
                error!("Scheduled run of {} could not be recorded: {}", key, e);
            }
        });
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
