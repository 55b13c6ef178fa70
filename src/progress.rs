//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive a
//! snapshot of a job record every time the orchestrator writes it.
//!
//! Callers can forward events to a channel, a terminal progress bar or a UI
//! store without the library knowing how the host application communicates.
//! The trait is `Send + Sync` because pipelines may run concurrently when
//! `concurrency > 1`.
//!
//! # Example
//!
//! ```rust
//! use c3d_convert::{BatchConfig, BatchProgressCallback, JobRecord};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     updates: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_status_change(&self, record: &JobRecord) {
//!         self.updates.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} → {}", record.file_name, record.status);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { updates: AtomicUsize::new(0) });
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::job::JobRecord;
use crate::report::BatchReport;
use std::sync::Arc;

/// Called by the orchestrator as files move through the pipeline.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// With `concurrency > 1`, `on_status_change` may be called concurrently for
/// different files. Implementations must protect shared mutable state with
/// `Mutex`, atomics or similar.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first pipeline starts.
    ///
    /// # Arguments
    /// * `total_files` — number of queued files this run will process
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called after every accepted write to a job record, with the record as
    /// it is after the write. Not called for writes discarded because the file
    /// was withdrawn.
    fn on_status_change(&self, record: &JobRecord) {
        let _ = record;
    }

    /// Called once after every pipeline of the run has finished.
    fn on_batch_complete(&self, report: &BatchReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
