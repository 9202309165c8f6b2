//! Per-schedule mutual exclusion.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::kind::ScheduleKey;

/// One lock per schedule key, acquired without waiting.
#[derive(Default)]
pub struct GuardTable {
    locks: DashMap<ScheduleKey, Arc<Mutex<()>>>,
}

/// Held while a schedule's job body runs. Dropping it releases the key.
pub struct ScheduleGuard {
    key: ScheduleKey,
    _permit: OwnedMutexGuard<()>,
}

impl GuardTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard for `key`, or `None` when another run holds it.
    pub fn try_acquire(&self, key: &ScheduleKey) -> Option<ScheduleGuard> {
        let lock = self.locks.entry(key.clone()).or_default().value().clone();
        match lock.try_lock_owned() {
            Ok(permit) => {
                debug!("Guard acquired for {}", key);
                Some(ScheduleGuard {
                    key: key.clone(),
                    _permit: permit,
                })
            }
            Err(_) => None,
        }
    }

    /// Whether a run currently holds the guard for `key`.
    pub fn is_held(&self, key: &ScheduleKey) -> bool {
        self.locks
            .get(key)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}

impl ScheduleGuard {
    pub fn key(&self) -> &ScheduleKey {
        &self.key
    }
}

impl Drop for ScheduleGuard {
    fn drop(&mut self) {
        debug!("Guard released for {}", self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ScheduleKind;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let table = GuardTable::new();
        let key = ScheduleKey::new(ScheduleKind::ContainerUpdate, 1u64);

        let guard = table.try_acquire(&key).unwrap();
        assert!(table.is_held(&key));
        assert!(table.try_acquire(&key).is_none());

        drop(guard);
        assert!(!table.is_held(&key));
        assert!(table.try_acquire(&key).is_some());
    }

    #[test]
    fn test_keys_are_independent() {
        let table = GuardTable::new();
        let a = ScheduleKey::new(ScheduleKind::ContainerUpdate, 1u64);
        let b = ScheduleKey::new(ScheduleKind::GitStackSync, 1u64);

        let _a = table.try_acquire(&a).unwrap();
        let guard_b = table.try_acquire(&b).unwrap();
        assert_eq!(guard_b.key(), &b);
    }

    #[test]
    fn test_unknown_key_not_held() {
        let table = GuardTable::new();
        assert!(!table.is_held(&ScheduleKey::new(ScheduleKind::EnvUpdateCheck, 9u64)));
    }
}
