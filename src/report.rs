//! Output types for a finished batch run.

use crate::job::{JobRecord, JobStatus};
use serde::{Deserialize, Serialize};

/// Result of one [`crate::batch::Batch::run`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Final records of the files this run processed, in submission order.
    /// Files withdrawn during the run are absent.
    pub files: Vec<JobRecord>,
    /// Files that ended `completed`.
    pub completed: usize,
    /// Files that ended `failed`.
    pub failed: usize,
    /// Files withdrawn before or while being processed.
    pub withdrawn: usize,
    /// Wall-clock duration of the run.
    pub total_duration_ms: u64,
}

impl BatchReport {
    pub(crate) fn from_records(files: Vec<JobRecord>, withdrawn: usize, total_duration_ms: u64) -> Self {
        let completed = files
            .iter()
            .filter(|r| matches!(r.status, JobStatus::Completed { .. }))
            .count();
        let failed = files
            .iter()
            .filter(|r| matches!(r.status, JobStatus::Failed { .. }))
            .count();
        Self {
            files,
            completed,
            failed,
            withdrawn,
            total_duration_ms,
        }
    }

    /// `true` when no processed file failed.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Records that completed, with their download urls.
    pub fn downloads(&self) -> impl Iterator<Item = (&JobRecord, &str)> {
        self.files
            .iter()
            .filter_map(|r| r.download_url().map(|url| (r, url)))
    }
}
