//! Drive one file through the remote pipeline.
//!
//! ```text
//! requesting-upload-url ─▶ uploading ─▶ converting ─▶ polling ─▶ completed
//!            │                 │             │            │
//!            └─────────────────┴─────────────┴────────────┴──▶ failed
//! ```
//!
//! Every phase is gated on the previous one. Whatever goes wrong is caught
//! here and written to the record as `Failed { reason }`; [`run_file`] itself
//! cannot fail, so the orchestrator never sees a per-file error.

use crate::config::BatchConfig;
use crate::error::{FailureReason, Phase};
use crate::formats::TargetFormat;
use crate::job::{FileId, JobStatus};
use crate::pipeline::input::SubmittedFile;
use crate::pipeline::poll::poll_until_terminal;
use crate::remote::{progress_percent, ConversionService, UploadProgressFn};
use crate::store::JobStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert one file and return its terminal status.
///
/// The returned status is also what was written to the store, unless the file
/// was withdrawn meanwhile, in which case the write was discarded.
pub async fn run_file(
    service: &dyn ConversionService,
    store: &JobStore,
    id: FileId,
    file: SubmittedFile,
    target: TargetFormat,
    config: &BatchConfig,
) -> JobStatus {
    let start = Instant::now();
    let name = file.name.clone();

    let status = match drive(service, store, id, file, target, config).await {
        Ok(download_url) => {
            info!(
                "{} {}: completed in {}ms",
                id,
                name,
                start.elapsed().as_millis()
            );
            JobStatus::Completed { download_url }
        }
        Err(reason) => {
            warn!("{} {}: {}", id, name, reason);
            JobStatus::Failed { reason }
        }
    };

    store.transition(id, status.clone());
    status
}

/// The happy path; any `Err` becomes the file's failure reason.
async fn drive(
    service: &dyn ConversionService,
    store: &JobStore,
    id: FileId,
    file: SubmittedFile,
    target: TargetFormat,
    config: &BatchConfig,
) -> Result<String, FailureReason> {
    let source_format = file.source_format();

    // ── Phase 1: upload location ─────────────────────────────────────────
    store.transition(id, JobStatus::RequestingUploadUrl);
    let upload_target = service
        .request_upload_url(&file.name)
        .await
        .map_err(|e| FailureReason::transport(Phase::UploadLocation, e))?;
    if let Some(ref pre) = upload_target.job_id {
        debug!("{} {}: upload url pre-allocated job {}", id, file.name, pre);
    }
    store.transition(id, JobStatus::Uploading { progress: 0 });

    // ── Phase 2: upload bytes ────────────────────────────────────────────
    let progress: UploadProgressFn = {
        let store = store.clone();
        Arc::new(move |sent, total| {
            store.record_progress(id, progress_percent(sent, total));
        })
    };
    service
        .upload(&upload_target, file.bytes, &file.content_type, progress)
        .await
        .map_err(|e| FailureReason::transport(Phase::Upload, e))?;
    store.transition(id, JobStatus::Converting);

    // ── Phase 3: request conversion ──────────────────────────────────────
    let job_id = service
        .request_conversion(&file.name, &source_format, target.as_str())
        .await
        .map_err(|e| FailureReason::transport(Phase::ConversionRequest, e))?;
    debug!(
        "{} {}: job {} ({} → {})",
        id,
        file.name,
        job_id,
        if source_format.is_empty() { "auto" } else { source_format.as_str() },
        target
    );
    store.assign_job_id(id, &job_id);

    // ── Poll, then fetch the download locator ────────────────────────────
    let terminal = poll_until_terminal(service, store, id, &job_id, config).await?;
    if !terminal.is_completed() {
        return Err(FailureReason::RemoteFailed {
            detail: terminal.error,
        });
    }

    service
        .download_url(&job_id)
        .await
        .map_err(|e| FailureReason::transport(Phase::DownloadReference, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::remote::{RemoteStatus, UploadTarget};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Single-file service: answers status polls from a queue.
    struct OneFile {
        statuses: Mutex<VecDeque<RemoteStatus>>,
        fail_upload_url: bool,
        seen_formats: Mutex<Option<(String, String)>>,
    }

    impl OneFile {
        fn with_statuses(statuses: &[&str]) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().map(|s| RemoteStatus::new(*s)).collect()),
                fail_upload_url: false,
                seen_formats: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ConversionService for OneFile {
        async fn request_upload_url(&self, _file_name: &str) -> Result<UploadTarget, RemoteError> {
            if self.fail_upload_url {
                return Err(RemoteError::Other("no bucket".into()));
            }
            Ok(UploadTarget {
                upload_url: "mem://upload".into(),
                job_id: None,
            })
        }

        async fn upload(
            &self,
            _target: &UploadTarget,
            body: Vec<u8>,
            _content_type: &str,
            progress: UploadProgressFn,
        ) -> Result<(), RemoteError> {
            let total = body.len() as u64;
            progress(total / 2, Some(total));
            progress(total, Some(total));
            Ok(())
        }

        async fn request_conversion(
            &self,
            _file_name: &str,
            source_format: &str,
            target_format: &str,
        ) -> Result<String, RemoteError> {
            *self.seen_formats.lock().unwrap() =
                Some((source_format.to_string(), target_format.to_string()));
            Ok("job-1".into())
        }

        async fn job_status(&self, _job_id: &str) -> Result<RemoteStatus, RemoteError> {
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| RemoteError::Other("status script exhausted".into()))
        }

        async fn download_url(&self, job_id: &str) -> Result<String, RemoteError> {
            Ok(format!("https://cdn.example/{job_id}.stl"))
        }
    }

    fn file() -> SubmittedFile {
        SubmittedFile::from_bytes("Part.STEP", vec![7; 10])
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_completes() {
        let svc = OneFile::with_statuses(&["processing", "completed"]);
        let store = JobStore::default();
        let id = store.insert("Part.STEP");

        let status = run_file(&svc, &store, id, file(), TargetFormat::Stl, &BatchConfig::default()).await;

        assert_eq!(
            status,
            JobStatus::Completed {
                download_url: "https://cdn.example/job-1.stl".into()
            }
        );
        let record = store.get(id).unwrap();
        assert_eq!(record.job_id.as_deref(), Some("job-1"));
        assert_eq!(record.progress, 100);
        assert_eq!(
            *svc.seen_formats.lock().unwrap(),
            Some(("step".to_string(), "stl".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_carries_detail() {
        let svc = OneFile::with_statuses(&["processing"]);
        svc.statuses.lock().unwrap().push_back(RemoteStatus {
            status: "failed".into(),
            error: Some("No shape found".into()),
        });
        let store = JobStore::default();
        let id = store.insert("Part.STEP");

        let status = run_file(&svc, &store, id, file(), TargetFormat::Obj, &BatchConfig::default()).await;

        assert_eq!(
            status,
            JobStatus::Failed {
                reason: FailureReason::RemoteFailed {
                    detail: Some("No shape found".into())
                }
            }
        );
        assert_eq!(store.get(id).unwrap().download_url(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_url_error_fails_without_job_id() {
        let mut svc = OneFile::with_statuses(&[]);
        svc.fail_upload_url = true;
        let store = JobStore::default();
        let id = store.insert("Part.STEP");

        let status = run_file(&svc, &store, id, file(), TargetFormat::Stl, &BatchConfig::default()).await;

        match status {
            JobStatus::Failed {
                reason: FailureReason::Transport { phase, .. },
            } => assert_eq!(phase, Phase::UploadLocation),
            other => panic!("expected transport failure, got {other:?}"),
        }
        let record = store.get(id).unwrap();
        assert_eq!(record.job_id, None);
        assert_eq!(record.progress, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_poller_gives_up() {
        let svc = OneFile::with_statuses(&["processing"; 5]);
        let store = JobStore::default();
        let id = store.insert("Part.STEP");
        let config = BatchConfig::builder()
            .max_poll_attempts(Some(3))
            .build()
            .unwrap();

        let status = run_file(&svc, &store, id, file(), TargetFormat::Stl, &config).await;

        assert_eq!(
            status,
            JobStatus::Failed {
                reason: FailureReason::PollAttemptsExhausted { attempts: 3 }
            }
        );
        assert_eq!(svc.statuses.lock().unwrap().len(), 2, "exactly three polls");
    }

    #[tokio::test(start_paused = true)]
    async fn poll_waits_one_interval_before_each_query() {
        let svc = OneFile::with_statuses(&["queued", "completed"]);
        let store = JobStore::default();
        let id = store.insert("Part.STEP");
        let config = BatchConfig::default();

        let started = tokio::time::Instant::now();
        let status = poll_until_terminal(&svc, &store, id, "job-1", &config).await.unwrap();

        assert!(status.is_completed());
        assert!(started.elapsed() >= config.poll_interval() * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn status_query_error_is_transport_failure() {
        let svc = OneFile::with_statuses(&[]);
        let store = JobStore::default();
        let id = store.insert("Part.STEP");

        let err = poll_until_terminal(&svc, &store, id, "job-1", &BatchConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FailureReason::Transport {
                phase: Phase::StatusQuery,
                ..
            }
        ));
    }
}
