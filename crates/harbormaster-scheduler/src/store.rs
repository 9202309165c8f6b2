//! Execution record persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::SchedulerError;
use crate::execution::{ExecutionId, ExecutionRecord, NewExecution};
use crate::query::{ExecutionPage, ExecutionQuery};

/// Execution store trait for persistence.
///
/// Stores serialize their own writes. A record is mutable until it reaches a
/// terminal status; later updates are rejected.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Create a `queued` record with the next id.
    async fn create(&self, new: NewExecution) -> Result<ExecutionRecord, SchedulerError>;

    /// Persist a changed record.
    async fn update(&self, record: &ExecutionRecord) -> Result<(), SchedulerError>;

    /// Load a record by id.
    async fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, SchedulerError>;

    /// Filtered, paginated history, newest first.
    async fn query(&self, query: &ExecutionQuery) -> Result<ExecutionPage, SchedulerError>;

    /// Delete terminal records finished before `cutoff`. Returns how many went.
    async fn prune_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize, SchedulerError>;
}

fn check_update(stored: &ExecutionRecord, record: &ExecutionRecord) -> Result<(), SchedulerError> {
    if stored.status.is_terminal() {
        return Err(SchedulerError::InvalidTransition {
            id: record.id,
            from: stored.status,
            to: record.status,
        });
    }
    Ok(())
}

fn is_prunable(record: &ExecutionRecord, cutoff: DateTime<Utc>) -> bool {
    record.status.is_terminal() && record.finished_at.is_some_and(|at| at < cutoff)
}

/// In-memory execution store.
pub struct MemoryExecutionStore {
    records: RwLock<BTreeMap<ExecutionId, ExecutionRecord>>,
    last_id: AtomicU64,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            last_id: AtomicU64::new(0),
        }
    }
}

impl Default for MemoryExecutionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn create(&self, new: NewExecution) -> Result<ExecutionRecord, SchedulerError> {
        let mut records = self.records.write().await;
        let id = ExecutionId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = ExecutionRecord::queued(id, new, Utc::now());
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        let mut records = self.records.write().await;
        let stored = records
            .get(&record.id)
            .ok_or(SchedulerError::ExecutionNotFound(record.id))?;
        check_update(stored, record)?;
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, SchedulerError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn query(&self, query: &ExecutionQuery) -> Result<ExecutionPage, SchedulerError> {
        let records = self.records.read().await;
        Ok(query.apply(records.values().cloned()))
    }

    async fn prune_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize, SchedulerError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !is_prunable(r, cutoff));
        Ok(before - records.len())
    }
}

/// File system execution store.
///
/// One JSON file per record:
/// ```text
/// {storage_path}/
/// └── executions/
///     ├── 00000000000000000001.json
///     └── 00000000000000000002.json
/// ```
/// The id counter is recovered from the highest file name at open.
pub struct FileExecutionStore {
    storage_path: PathBuf,
    /// Last assigned id. Held across every write.
    last_id: Mutex<u64>,
}

impl FileExecutionStore {
    /// Open (or create) a store under `storage_path`.
    pub async fn open(storage_path: impl Into<PathBuf>) -> Result<Self, SchedulerError> {
        let storage_path = storage_path.into();
        let dir = storage_path.join("executions");
        fs::create_dir_all(&dir).await.map_err(|e| {
            SchedulerError::Store(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let mut last_id = 0;
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = parse_record_file(&entry.path()) {
                last_id = last_id.max(id);
            }
        }

        debug!(
            "FileExecutionStore opened at {:?} (last id {})",
            storage_path, last_id
        );
        Ok(Self {
            storage_path,
            last_id: Mutex::new(last_id),
        })
    }

    fn executions_dir(&self) -> PathBuf {
        self.storage_path.join("executions")
    }

    fn record_path(&self, id: ExecutionId) -> PathBuf {
        self.executions_dir().join(format!("{:020}.json", id.0))
    }

    async fn read_record(&self, path: &Path) -> Result<ExecutionRecord, SchedulerError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        let path = self.record_path(record.id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(record)?;
        fs::write(&tmp, content).await.map_err(|e| {
            SchedulerError::Store(format!("Failed to write execution #{}: {}", record.id, e))
        })?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Every readable record. Unreadable files are logged and skipped.
    async fn load_all(&self) -> Result<Vec<ExecutionRecord>, SchedulerError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(self.executions_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if parse_record_file(&path).is_none() {
                continue;
            }
            match self.read_record(&path).await {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable execution file {:?}: {}", path, e),
            }
        }
        Ok(records)
    }
}

fn parse_record_file(path: &Path) -> Option<u64> {
    if path.extension()? != "json" {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

#[async_trait]
impl ExecutionStore for FileExecutionStore {
    async fn create(&self, new: NewExecution) -> Result<ExecutionRecord, SchedulerError> {
        let mut last_id = self.last_id.lock().await;
        let id = ExecutionId(*last_id + 1);
        let record = ExecutionRecord::queued(id, new, Utc::now());
        self.write_record(&record).await?;
        *last_id = id.0;
        Ok(record)
    }

    async fn update(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        let _writes = self.last_id.lock().await;
        let path = self.record_path(record.id);
        if !fs::try_exists(&path).await? {
            return Err(SchedulerError::ExecutionNotFound(record.id));
        }
        let stored = self.read_record(&path).await?;
        check_update(&stored, record)?;
        self.write_record(record).await
    }

    async fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, SchedulerError> {
        let path = self.record_path(id);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        self.read_record(&path).await.map(Some)
    }

    async fn query(&self, query: &ExecutionQuery) -> Result<ExecutionPage, SchedulerError> {
        Ok(query.apply(self.load_all().await?))
    }

    async fn prune_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize, SchedulerError> {
        let _writes = self.last_id.lock().await;
        let mut pruned = 0;
        for record in self.load_all().await? {
            if is_prunable(&record, cutoff) {
                fs::remove_file(self.record_path(record.id)).await?;
                pruned += 1;
            }
        }
        debug!("Pruned {} execution records", pruned);
        Ok(pruned)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
