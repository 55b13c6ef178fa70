//! Batch orchestrator: run every queued file through the pipeline.
//!
//! ## Scheduling
//!
//! With the default `concurrency = 1` each file's pipeline is awaited to a
//! terminal state before the next one starts. At most one remote exchange is
//! outstanding, and remote calls of file N+1 never precede those of file N.
//! With `concurrency = n > 1`, up to `n` pipelines run at once. The next
//! queued file is admitted as soon as one finishes.
//!
//! Either way a file's failure is contained by [`run_file`]: the batch always
//! runs to the end and reports mixed outcomes.
//!
//! ## Withdrawal
//!
//! [`Batch::withdraw`] drops the record and any queued payload immediately.
//! A pipeline already in flight keeps talking to the service (there is no
//! cancellation), but every write it makes afterwards is discarded by the
//! store.
//!
//! ## Dropping a run
//!
//! Dropping the `run` future (a timeout, `select!`) stops its pipelines at
//! their next await point. Files that had started are marked
//! `Failed { Cancelled }`; files not yet started stay queued for a later run.

use crate::config::BatchConfig;
use crate::error::{ConvertError, FailureReason};
use crate::formats::TargetFormat;
use crate::job::{FileId, JobRecord, JobStatus};
use crate::pipeline::input::SubmittedFile;
use crate::pipeline::run::run_file;
use crate::remote::ConversionService;
use crate::report::BatchReport;
use crate::store::JobStore;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A set of files converted under one target-format selection.
pub struct Batch {
    service: Arc<dyn ConversionService>,
    config: BatchConfig,
    store: JobStore,
    /// Files accepted but not yet handed to a pipeline, in submission order.
    queue: Mutex<Vec<(FileId, SubmittedFile)>>,
    target: Mutex<TargetFormat>,
    running: AtomicBool,
}

/// Ends a run: clears the running flag and, if the `run` future was dropped
/// midway, fails the files it left in flight.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    store: &'a JobStore,
    pending: Vec<FileId>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        for &id in &self.pending {
            // Files still queued stay queued for the next run.
            let failed = self.store.update(id, |record| {
                if !record.status.is_in_flight() {
                    return false;
                }
                record.status = JobStatus::Failed {
                    reason: FailureReason::Cancelled,
                };
                true
            });
            if failed {
                warn!("Run dropped while {} was in progress; marked failed", id);
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Batch {
    pub fn new(service: Arc<dyn ConversionService>, config: BatchConfig, target: TargetFormat) -> Self {
        let store = JobStore::new(config.progress_callback.clone());
        Self {
            service,
            config,
            store,
            queue: Mutex::new(Vec::new()),
            target: Mutex::new(target),
            running: AtomicBool::new(false),
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, Vec<(FileId, SubmittedFile)>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Accept a file: creates its `queued` record immediately.
    ///
    /// The observer hears about the record before the queue lock is taken, so
    /// it may call back into the batch.
    pub fn submit(&self, file: SubmittedFile) -> FileId {
        let id = self.store.insert(file.name.clone());
        let mut queue = self.lock_queue();
        // Withdrawn from inside the observer: nothing to queue.
        if !self.store.contains(id) {
            debug!("{} {} withdrawn before it was queued", id, file.name);
            return id;
        }
        debug!("Queued {} {} ({} bytes)", id, file.name, file.bytes.len());
        queue.push((id, file));
        id
    }

    /// Remove a file from the batch, whatever its state.
    ///
    /// Returns the record as it was at removal, or `None` if unknown.
    pub fn withdraw(&self, id: FileId) -> Option<JobRecord> {
        let mut queue = self.lock_queue();
        queue.retain(|(queued, _)| *queued != id);
        let removed = self.store.remove(id);
        if let Some(ref r) = removed {
            info!("Withdrew {} {} while {}", id, r.file_name, r.status);
        }
        removed
    }

    pub fn target_format(&self) -> TargetFormat {
        *self.target.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Change the target format. Files whose pipeline already started keep
    /// the format they started with.
    pub fn set_target_format(&self, target: TargetFormat) {
        *self.target.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = target;
    }

    pub fn get(&self, id: FileId) -> Option<JobRecord> {
        self.store.get(id)
    }

    /// All records in submission order.
    pub fn records(&self) -> Vec<JobRecord> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Number of files waiting for a pipeline.
    pub fn queued(&self) -> usize {
        self.lock_queue().len()
    }

    /// `true` while any file is between its first remote call and a terminal
    /// state.
    pub fn is_busy(&self) -> bool {
        self.store.is_busy()
    }

    /// Discard every record and the queue. Refused while a run is active.
    pub fn clear(&self) -> Result<(), ConvertError> {
        let mut queue = self.lock_queue();
        if self.running.load(Ordering::SeqCst) {
            let in_flight = self.store.in_flight();
            return Err(if in_flight > 0 {
                ConvertError::BatchBusy { in_flight }
            } else {
                ConvertError::BatchRunning
            });
        }
        self.store.clear()?;
        queue.clear();
        Ok(())
    }

    /// Convert every queued file.
    ///
    /// # Errors
    /// - [`ConvertError::BatchRunning`] if another `run` is active
    /// - [`ConvertError::EmptyBatch`] if nothing is queued; no pipeline starts
    ///
    /// Per-file failures are never returned here; inspect the report.
    pub async fn run(&self) -> Result<BatchReport, ConvertError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ConvertError::BatchRunning);
        }
        let pending: Vec<FileId> = self.lock_queue().iter().map(|(id, _)| *id).collect();
        let guard = RunGuard {
            running: &self.running,
            store: &self.store,
            pending,
        };
        let pending = guard.pending.as_slice();
        if pending.is_empty() {
            return Err(ConvertError::EmptyBatch);
        }

        let start = Instant::now();
        info!(
            "Starting batch: {} file(s) → {}, concurrency {}",
            pending.len(),
            self.target_format(),
            self.config.concurrency
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(pending.len());
        }

        if self.config.concurrency <= 1 {
            for &id in pending {
                self.process(id).await;
            }
        } else {
            stream::iter(pending.iter().copied())
                .map(|id| self.process(id))
                .buffer_unordered(self.config.concurrency)
                .collect::<Vec<_>>()
                .await;
        }

        let mut files = Vec::with_capacity(pending.len());
        let mut withdrawn = 0;
        for &id in pending {
            match self.store.get(id) {
                Some(record) => files.push(record),
                None => withdrawn += 1,
            }
        }
        let report = BatchReport::from_records(files, withdrawn, start.elapsed().as_millis() as u64);

        info!(
            "Batch complete: {} completed, {} failed, {} withdrawn, {}ms",
            report.completed, report.failed, report.withdrawn, report.total_duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(&report);
        }
        Ok(report)
    }

    /// Run one file's pipeline, unless it was withdrawn before its turn.
    async fn process(&self, id: FileId) -> Option<JobStatus> {
        let file = {
            let mut queue = self.lock_queue();
            let pos = queue.iter().position(|(queued, _)| *queued == id);
            pos.map(|pos| queue.remove(pos).1)
        };
        let Some(file) = file else {
            debug!("Skipping {}: withdrawn before start", id);
            return None;
        };

        // Read at start so a mid-batch change only affects later files.
        let target = self.target_format();
        Some(run_file(self.service.as_ref(), &self.store, id, file, target, &self.config).await)
    }
}
