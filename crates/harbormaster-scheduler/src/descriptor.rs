//! Schedule descriptors and where they come from.

use std::collections::HashMap;

use async_trait::async_trait;
use harbormaster_auth::EnvironmentId;
use harbormaster_config::{ScheduleConfig, ScheduleIdValue};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::SchedulerError;
use crate::kind::{ScheduleId, ScheduleKey, ScheduleKind, SystemJob};

/// Persistent description of one schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDescriptor {
    pub kind: ScheduleKind,
    pub id: ScheduleId,
    #[serde(default)]
    pub environment_id: Option<EnvironmentId>,
    pub cron: String,
    pub enabled: bool,
    #[serde(default)]
    pub name: Option<String>,
}

impl ScheduleDescriptor {
    pub fn new(kind: ScheduleKind, id: impl Into<ScheduleId>, cron: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            environment_id: None,
            cron: cron.into(),
            enabled: true,
            name: None,
        }
    }

    pub fn in_environment(mut self, env: EnvironmentId) -> Self {
        self.environment_id = Some(env);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn key(&self) -> ScheduleKey {
        ScheduleKey::new(self.kind, self.id.clone())
    }

    /// Default descriptor for a system job.
    pub fn system(job: SystemJob) -> Self {
        let key = job.key();
        Self {
            kind: key.kind,
            id: key.id,
            environment_id: None,
            cron: job.default_cron().to_string(),
            enabled: true,
            name: Some(job.as_str().replace('_', " ")),
        }
    }

    /// Build from a `[[schedules]]` entry.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, SchedulerError> {
        let kind: ScheduleKind = config.kind.parse()?;
        let id = match &config.id {
            ScheduleIdValue::Number(n) => ScheduleId::Numeric(*n),
            ScheduleIdValue::Name(name) => name.parse()?,
        };
        if kind == ScheduleKind::SystemCleanup && SystemJob::from_id(&id).is_none() {
            return Err(SchedulerError::UnknownSystemJob(id.to_string()));
        }
        crate::cron_expr::parse(&config.cron)?;

        // Env update checks are keyed by their environment.
        let environment_id = match (kind, &id, config.environment) {
            (_, _, Some(env)) => Some(EnvironmentId(env)),
            (ScheduleKind::EnvUpdateCheck, ScheduleId::Numeric(n), None) => Some(EnvironmentId(*n)),
            _ => None,
        };

        Ok(Self {
            kind,
            id,
            environment_id,
            cron: config.cron.clone(),
            enabled: config.enabled,
            name: config.name.clone(),
        })
    }
}

/// Descriptor collaborator: the registry reads, toggles write.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    async fn get(&self, key: &ScheduleKey) -> Result<Option<ScheduleDescriptor>, SchedulerError>;

    async fn list_enabled(&self) -> Result<Vec<ScheduleDescriptor>, SchedulerError>;

    /// Persist the enabled flag. `None` when the descriptor does not exist.
    async fn set_enabled(
        &self,
        key: &ScheduleKey,
        enabled: bool,
    ) -> Result<Option<ScheduleDescriptor>, SchedulerError>;
}

/// In-memory descriptor table.
#[derive(Default)]
pub struct MemoryDescriptorSource {
    descriptors: RwLock<HashMap<ScheduleKey, ScheduleDescriptor>>,
}

impl MemoryDescriptorSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with every system job at its default cron.
    pub fn with_system_jobs() -> Self {
        Self::from_descriptors(SystemJob::ALL.into_iter().map(ScheduleDescriptor::system))
    }

    /// System jobs plus configured schedules; configuration wins on conflict.
    pub fn from_config(schedules: &[ScheduleConfig]) -> Result<Self, SchedulerError> {
        let mut descriptors: Vec<_> = SystemJob::ALL
            .into_iter()
            .map(ScheduleDescriptor::system)
            .collect();
        for config in schedules {
            let mut descriptor = ScheduleDescriptor::from_config(config)?;
            if !descriptor.kind.can_disable() {
                descriptor.enabled = true;
            }
            descriptors.push(descriptor);
        }
        Ok(Self::from_descriptors(descriptors))
    }

    /// Later entries replace earlier ones with the same key.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ScheduleDescriptor>) -> Self {
        let descriptors = descriptors.into_iter().map(|d| (d.key(), d)).collect();
        Self {
            descriptors: RwLock::new(descriptors),
        }
    }

    /// Insert or replace a descriptor.
    pub async fn upsert(&self, descriptor: ScheduleDescriptor) {
        self.descriptors
            .write()
            .await
            .insert(descriptor.key(), descriptor);
    }

    pub async fn remove(&self, key: &ScheduleKey) -> Option<ScheduleDescriptor> {
        self.descriptors.write().await.remove(key)
    }

    pub async fn all(&self) -> Vec<ScheduleDescriptor> {
        let mut all: Vec<_> = self.descriptors.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.key().cmp(&b.key()));
        all
    }
}

#[async_trait]
impl DescriptorSource for MemoryDescriptorSource {
    async fn get(&self, key: &ScheduleKey) -> Result<Option<ScheduleDescriptor>, SchedulerError> {
        Ok(self.descriptors.read().await.get(key).cloned())
    }

    async fn list_enabled(&self) -> Result<Vec<ScheduleDescriptor>, SchedulerError> {
        Ok(self
            .all()
            .await
            .into_iter()
            .filter(|d| d.enabled)
            .collect())
    }

    async fn set_enabled(
        &self,
        key: &ScheduleKey,
        enabled: bool,
    ) -> Result<Option<ScheduleDescriptor>, SchedulerError> {
        let mut descriptors = self.descriptors.write().await;
        Ok(descriptors.get_mut(key).map(|d| {
            d.enabled = enabled;
            d.clone()
        }))
    }
}
