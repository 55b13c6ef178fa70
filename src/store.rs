//! In-memory job record store.
//!
//! The store is the single source of truth for per-file status. It is cheap to
//! clone (shared `Arc` state) so a pipeline can hand a handle to an upload
//! progress closure.
//!
//! Every writer goes through [`JobStore::update`], which checks existence
//! under the lock: a write for a withdrawn file is discarded and never
//! recreates the record. Ids are never reused, so a late write cannot hit a
//! different file either.

use crate::error::ConvertError;
use crate::job::{FileId, JobRecord, JobStatus};
use crate::progress::ProgressCallback;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

#[derive(Default)]
struct Inner {
    next_id: u64,
    records: HashMap<FileId, JobRecord>,
    /// Insertion order of the live records.
    order: Vec<FileId>,
}

/// Shared, session-scoped job record store.
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<Mutex<Inner>>,
    observer: Option<ProgressCallback>,
}

impl JobStore {
    pub fn new(observer: Option<ProgressCallback>) -> Self {
        Self {
            inner: Arc::default(),
            observer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking observer must not wedge the whole batch.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create a `queued` record for a newly accepted file.
    pub fn insert(&self, file_name: impl Into<String>) -> FileId {
        let record = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = FileId(inner.next_id);
            let record = JobRecord::queued(id, file_name);
            inner.records.insert(id, record.clone());
            inner.order.push(id);
            record
        };
        self.notify(&record);
        record.id
    }

    pub fn get(&self, id: FileId) -> Option<JobRecord> {
        self.lock().records.get(&id).cloned()
    }

    pub fn contains(&self, id: FileId) -> bool {
        self.lock().records.contains_key(&id)
    }

    /// Delete a record. In-flight writers for it become no-ops.
    pub fn remove(&self, id: FileId) -> Option<JobRecord> {
        let mut inner = self.lock();
        let removed = inner.records.remove(&id);
        if removed.is_some() {
            inner.order.retain(|&other| other != id);
        }
        removed
    }

    /// All live records in insertion order.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records started but not yet terminal.
    pub fn in_flight(&self) -> usize {
        self.lock()
            .records
            .values()
            .filter(|r| r.status.is_in_flight())
            .count()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight() > 0
    }

    /// Discard every record, provided nothing is in flight.
    pub fn clear(&self) -> Result<(), ConvertError> {
        let mut inner = self.lock();
        let in_flight = inner
            .records
            .values()
            .filter(|r| r.status.is_in_flight())
            .count();
        if in_flight > 0 {
            return Err(ConvertError::BatchBusy { in_flight });
        }
        inner.records.clear();
        inner.order.clear();
        Ok(())
    }

    /// Apply `f` to the record for `id` if it still exists.
    ///
    /// `f` returns whether it changed anything; only changed records are
    /// reported to the observer. Returns `false` when the record is gone or
    /// `f` declined the write.
    pub fn update(&self, id: FileId, f: impl FnOnce(&mut JobRecord) -> bool) -> bool {
        let snapshot = {
            let mut inner = self.lock();
            let Some(record) = inner.records.get_mut(&id) else {
                debug!("Discarding write for withdrawn file {}", id);
                return false;
            };
            if !f(record) {
                return false;
            }
            record.clone()
        };
        self.notify(&snapshot);
        true
    }

    /// Move a record to `status`. Terminal records are frozen.
    pub fn transition(&self, id: FileId, status: JobStatus) -> bool {
        self.update(id, |record| {
            if record.status.is_terminal() {
                warn!(
                    "File {} ({}): ignoring {} after terminal {}",
                    id, record.file_name, status, record.status
                );
                return false;
            }
            if let JobStatus::Uploading { progress } = status {
                record.progress = record.progress.max(progress);
            }
            record.status = status;
            true
        })
    }

    /// Record upload progress. Only accepted while uploading; never moves the
    /// percentage backwards.
    pub fn record_progress(&self, id: FileId, percent: u8) -> bool {
        let percent = percent.min(100);
        self.update(id, |record| match record.status {
            JobStatus::Uploading { progress } if percent > progress => {
                record.status = JobStatus::Uploading { progress: percent };
                record.progress = percent;
                true
            }
            _ => false,
        })
    }

    /// Store the remote job id and enter `polling`.
    pub fn assign_job_id(&self, id: FileId, job_id: &str) -> bool {
        self.update(id, |record| {
            if record.status.is_terminal() {
                return false;
            }
            record.job_id = Some(job_id.to_string());
            record.status = JobStatus::Polling {
                remote_status: None,
            };
            true
        })
    }

    fn notify(&self, record: &JobRecord) {
        if let Some(ref cb) = self.observer {
            cb.on_status_change(record);
        }
    }
}
