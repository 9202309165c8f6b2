//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod schema_auth;
mod schema_jobs;

pub use schema_auth::*;
pub use schema_jobs::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub license: LicenseConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Schedule descriptors armed at startup.
    #[serde(default)]
    pub schedules: Vec<ScheduleConfig>,

    /// Commands backing each job kind.
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// License tier configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// Whether the deployment runs with an Enterprise license.
    #[serde(default)]
    pub enterprise: bool,
}

/// Scheduler runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Directory holding execution history.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Default page size for execution history queries.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Finished executions older than this are pruned by the cleanup job.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("harbormaster"))
        .unwrap_or_else(|| PathBuf::from("~/.harbormaster"))
}

fn default_page_limit() -> usize {
    50
}

fn default_retention_days() -> u32 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            page_limit: default_page_limit(),
            retention_days: default_retention_days(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Also write logs to a daily rolling file.
    #[serde(default = "default_true")]
    pub file: bool,

    /// Log directory (defaults to `<data_dir>/logs`).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: default_true(),
            dir: None,
        }
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
