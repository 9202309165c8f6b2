//! Schedule descriptor and job command configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::default_true;

/// Schedule id as written in TOML: a number or a well-known name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleIdValue {
    Number(u64),
    Name(String),
}

impl fmt::Display for ScheduleIdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleIdValue::Number(n) => write!(f, "{}", n),
            ScheduleIdValue::Name(s) => write!(f, "{}", s),
        }
    }
}

/// A schedule descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// One of `container_update`, `git_stack_sync`, `env_update_check`, `system_cleanup`.
    pub kind: String,
    pub id: ScheduleIdValue,
    /// Owning environment; absent for global jobs.
    #[serde(default)]
    pub environment: Option<u64>,
    /// Cron expression (5 fields, or 6/7 with seconds).
    pub cron: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Commands backing the job kinds that talk to external systems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default)]
    pub container_update: Option<JobCommandConfig>,

    #[serde(default)]
    pub git_stack_sync: Option<JobCommandConfig>,

    #[serde(default)]
    pub env_update_check: Option<JobCommandConfig>,
}

/// A shell command run as a job body.
///
/// The schedule id and environment id are passed as `HARBORMASTER_SCHEDULE_ID`
/// and `HARBORMASTER_ENVIRONMENT_ID`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCommandConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}
