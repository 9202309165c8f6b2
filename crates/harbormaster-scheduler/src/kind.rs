//! Schedule kinds, ids and keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// The closed set of schedule kinds. Each kind has exactly one job body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Pull newer images for a container and recreate it.
    ContainerUpdate,
    /// Pull a git repository and redeploy the stack built from it.
    GitStackSync,
    /// Scan an environment for available image updates.
    EnvUpdateCheck,
    /// Built-in housekeeping. Always enabled.
    SystemCleanup,
}

impl ScheduleKind {
    pub const ALL: [ScheduleKind; 4] = [
        ScheduleKind::ContainerUpdate,
        ScheduleKind::GitStackSync,
        ScheduleKind::EnvUpdateCheck,
        ScheduleKind::SystemCleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::ContainerUpdate => "container_update",
            ScheduleKind::GitStackSync => "git_stack_sync",
            ScheduleKind::EnvUpdateCheck => "env_update_check",
            ScheduleKind::SystemCleanup => "system_cleanup",
        }
    }

    /// Whether schedules of this kind may be disabled.
    pub fn can_disable(&self) -> bool {
        !matches!(self, ScheduleKind::SystemCleanup)
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| SchedulerError::UnknownScheduleKind(s.to_string()))
    }
}

/// Schedule id: a numeric entity id or a well-known name (system jobs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleId {
    Numeric(u64),
    Named(String),
}

impl ScheduleId {
    /// Validated named id: lowercase ascii letters, digits, `_` and `-`.
    pub fn named(name: impl Into<String>) -> Result<Self, SchedulerError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if valid {
            Ok(ScheduleId::Named(name))
        } else {
            Err(SchedulerError::InvalidScheduleId(name))
        }
    }

    pub fn as_numeric(&self) -> Option<u64> {
        match self {
            ScheduleId::Numeric(n) => Some(*n),
            ScheduleId::Named(_) => None,
        }
    }
}

impl From<u64> for ScheduleId {
    fn from(id: u64) -> Self {
        ScheduleId::Numeric(id)
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleId::Numeric(n) => write!(f, "{}", n),
            ScheduleId::Named(s) => f.write_str(s),
        }
    }
}

impl FromStr for ScheduleId {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<u64>()
                .map(ScheduleId::Numeric)
                .map_err(|_| SchedulerError::InvalidScheduleId(s.to_string()));
        }
        ScheduleId::named(s)
    }
}

/// Identity of a schedule: (kind, id). Guards and timers are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleKey {
    pub kind: ScheduleKind,
    pub id: ScheduleId,
}

impl ScheduleKey {
    pub fn new(kind: ScheduleKind, id: impl Into<ScheduleId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Fixed system cleanup jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemJob {
    /// Prunes old execution records.
    ScheduleCleanup,
    /// Prunes old container events.
    EventCleanup,
    /// Removes leftover volume helper containers.
    VolumeHelperCleanup,
}

impl SystemJob {
    pub const ALL: [SystemJob; 3] = [
        SystemJob::ScheduleCleanup,
        SystemJob::EventCleanup,
        SystemJob::VolumeHelperCleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemJob::ScheduleCleanup => "schedule_cleanup",
            SystemJob::EventCleanup => "event_cleanup",
            SystemJob::VolumeHelperCleanup => "volume_helper_cleanup",
        }
    }

    /// Cron used when configuration does not override it.
    pub fn default_cron(&self) -> &'static str {
        match self {
            SystemJob::ScheduleCleanup => "0 3 * * *",
            SystemJob::EventCleanup => "30 3 * * *",
            SystemJob::VolumeHelperCleanup => "*/30 * * * *",
        }
    }

    pub fn key(&self) -> ScheduleKey {
        ScheduleKey::new(
            ScheduleKind::SystemCleanup,
            ScheduleId::Named(self.as_str().to_string()),
        )
    }

    pub fn from_id(id: &ScheduleId) -> Option<SystemJob> {
        match id {
            ScheduleId::Named(name) => Self::ALL.into_iter().find(|job| job.as_str() == name),
            ScheduleId::Numeric(_) => None,
        }
    }
}

impl fmt::Display for SystemJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemJob {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|job| job.as_str() == s.trim())
            .ok_or_else(|| SchedulerError::UnknownSystemJob(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(
            "git_stack_sync".parse::<ScheduleKind>().unwrap(),
            ScheduleKind::GitStackSync
        );
        assert_eq!(
            "container-update".parse::<ScheduleKind>().unwrap(),
            ScheduleKind::ContainerUpdate
        );
        assert!(matches!(
            "backup".parse::<ScheduleKind>(),
            Err(SchedulerError::UnknownScheduleKind(_))
        ));
    }

    #[test]
    fn test_kind_serde_matches_display() {
        for kind in ScheduleKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_only_system_cleanup_is_fixed() {
        assert!(!ScheduleKind::SystemCleanup.can_disable());
        assert!(ScheduleKind::EnvUpdateCheck.can_disable());
    }

    #[test]
    fn test_schedule_id_parse() {
        assert_eq!("42".parse::<ScheduleId>().unwrap(), ScheduleId::Numeric(42));
        assert_eq!(
            "event_cleanup".parse::<ScheduleId>().unwrap(),
            ScheduleId::Named("event_cleanup".to_string())
        );
        assert!("".parse::<ScheduleId>().is_err());
        assert!("Bad Name".parse::<ScheduleId>().is_err());
        assert!("99999999999999999999999".parse::<ScheduleId>().is_err());
    }

    #[test]
    fn test_schedule_id_serde_untagged() {
        let numeric: ScheduleId = serde_json::from_str("7").unwrap();
        assert_eq!(numeric, ScheduleId::Numeric(7));
        let named: ScheduleId = serde_json::from_str("\"schedule_cleanup\"").unwrap();
        assert_eq!(named.to_string(), "schedule_cleanup");
    }

    #[test]
    fn test_key_display() {
        let key = ScheduleKey::new(ScheduleKind::ContainerUpdate, 12u64);
        assert_eq!(key.to_string(), "container_update:12");
    }

    #[test]
    fn test_system_jobs() {
        for job in SystemJob::ALL {
            let key = job.key();
            assert_eq!(key.kind, ScheduleKind::SystemCleanup);
            assert_eq!(SystemJob::from_id(&key.id), Some(job));
        }
        assert!(SystemJob::from_id(&ScheduleId::Numeric(1)).is_none());
        assert!(matches!(
            "disk_cleanup".parse::<SystemJob>(),
            Err(SchedulerError::UnknownSystemJob(_))
        ));
    }
}
