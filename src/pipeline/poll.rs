//! Status poller: wait, query, record, repeat until the remote job is terminal.
//!
//! The first query happens one interval after conversion was requested, so
//! even a job that is already `completed` costs one interval. Each answer is
//! written to the record as `polling:<status>` before the terminal check.

use crate::config::BatchConfig;
use crate::error::{FailureReason, Phase};
use crate::job::{FileId, JobStatus};
use crate::remote::{ConversionService, RemoteStatus};
use crate::store::JobStore;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Poll `job_id` until it reports `completed` or `failed`.
///
/// # Errors
/// - [`FailureReason::Transport`] when a status query fails
/// - [`FailureReason::PollAttemptsExhausted`] when `max_poll_attempts` is set
///   and reached without a terminal status
pub async fn poll_until_terminal(
    service: &dyn ConversionService,
    store: &JobStore,
    id: FileId,
    job_id: &str,
    config: &BatchConfig,
) -> Result<RemoteStatus, FailureReason> {
    let interval = config.poll_interval();
    let mut attempts: u32 = 0;

    loop {
        sleep(interval).await;
        attempts = attempts.saturating_add(1);

        let status = service
            .job_status(job_id)
            .await
            .map_err(|e| FailureReason::transport(Phase::StatusQuery, e))?;
        debug!("Job {} poll {}: {}", job_id, attempts, status.status);

        store.transition(
            id,
            JobStatus::Polling {
                remote_status: Some(status.status.clone()),
            },
        );

        if status.is_terminal() {
            return Ok(status);
        }

        if let Some(max) = config.max_poll_attempts {
            if attempts >= max {
                warn!(
                    "Job {}: still '{}' after {} polls, giving up",
                    job_id, status.status, attempts
                );
                return Err(FailureReason::PollAttemptsExhausted { attempts });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::remote::{UploadProgressFn, UploadTarget};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Answers `processing` forever and counts status queries.
    #[derive(Default)]
    struct NeverDone {
        queries: AtomicU32,
    }

    #[async_trait]
    impl ConversionService for NeverDone {
        async fn request_upload_url(&self, _: &str) -> Result<UploadTarget, RemoteError> {
            Err(RemoteError::Other("unused".into()))
        }
        async fn upload(
            &self,
            _: &UploadTarget,
            _: Vec<u8>,
            _: &str,
            _: UploadProgressFn,
        ) -> Result<(), RemoteError> {
            Err(RemoteError::Other("unused".into()))
        }
        async fn request_conversion(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<String, RemoteError> {
            Err(RemoteError::Other("unused".into()))
        }
        async fn job_status(&self, _: &str) -> Result<RemoteStatus, RemoteError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteStatus::new("processing"))
        }
        async fn download_url(&self, _: &str) -> Result<String, RemoteError> {
            Err(RemoteError::Other("unused".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_bound_stops_polling() {
        let service = NeverDone::default();
        let store = JobStore::new(None);
        let id = store.insert("part.stl");
        let config = BatchConfig::builder()
            .max_poll_attempts(Some(3))
            .build()
            .unwrap();

        let err = poll_until_terminal(&service, &store, id, "job-1", &config)
            .await
            .unwrap_err();

        assert_eq!(err, FailureReason::PollAttemptsExhausted { attempts: 3 });
        assert_eq!(service.queries.load(Ordering::SeqCst), 3);
        assert_eq!(
            store.get(id).unwrap().status,
            JobStatus::Polling {
                remote_status: Some("processing".into())
            }
        );
    }
}
