//! Per-file job state: identity, status variant and the job record.
//!
//! [`JobStatus`] is the state machine. [`JobStatus::label`] renders the
//! free-text labels (`queued`, `uploading`, `polling:<remote>`, …) that
//! external display code and logs consume.

use crate::classify::{BadgeCategory, StatusBadge};
use crate::error::FailureReason;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one submitted file within a session.
///
/// Assigned from a monotonic counter at queue acceptance and never reused, so
/// two uploads sharing a file name still get independent records and a write
/// aimed at a withdrawn file can never land on a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a file is in the conversion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted into the queue, pipeline not started.
    Queued,
    /// Asking the service for an upload destination.
    RequestingUploadUrl,
    /// Transferring bytes; `progress` is the last reported percentage.
    Uploading { progress: u8 },
    /// Upload finished, conversion being requested.
    Converting,
    /// Waiting on the remote job. `None` until the first poll answers.
    Polling { remote_status: Option<String> },
    /// Converted artifact is available at `download_url`.
    Completed { download_url: String },
    /// The file failed; the batch carries on.
    Failed { reason: FailureReason },
}

impl JobStatus {
    /// `Completed` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }

    /// Started but not yet terminal.
    pub fn is_in_flight(&self) -> bool {
        !self.is_terminal() && !matches!(self, JobStatus::Queued)
    }

    /// Free-text label.
    pub fn label(&self) -> String {
        match self {
            JobStatus::Queued => "queued".to_string(),
            JobStatus::RequestingUploadUrl => "requesting-upload-url".to_string(),
            JobStatus::Uploading { .. } => "uploading".to_string(),
            JobStatus::Converting => "converting".to_string(),
            JobStatus::Polling {
                remote_status: None,
            } => "polling".to_string(),
            JobStatus::Polling {
                remote_status: Some(remote),
            } => format!("polling:{remote}"),
            JobStatus::Completed { .. } => "completed".to_string(),
            JobStatus::Failed { .. } => "failed".to_string(),
        }
    }

    /// Presentation badge straight from the variant.
    pub fn badge(&self) -> StatusBadge {
        match self {
            JobStatus::Queued => StatusBadge::new(BadgeCategory::Muted, "Ready"),
            JobStatus::Completed { .. } => StatusBadge::new(BadgeCategory::Success, "Completed"),
            JobStatus::Failed { .. } => StatusBadge::new(BadgeCategory::Danger, "Failed"),
            _ => StatusBadge::new(BadgeCategory::Primary, "Processing"),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Everything the orchestrator knows about one submitted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: FileId,
    pub file_name: String,
    pub status: JobStatus,
    /// Upload percentage, 0–100. Frozen once the upload phase ends.
    pub progress: u8,
    /// Remote job identifier, set once conversion is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl JobRecord {
    pub(crate) fn queued(id: FileId, file_name: impl Into<String>) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            status: JobStatus::Queued,
            progress: 0,
            job_id: None,
        }
    }

    /// Download locator, present only once the job completed.
    pub fn download_url(&self) -> Option<&str> {
        match &self.status {
            JobStatus::Completed { download_url } => Some(download_url),
            _ => None,
        }
    }

    /// Failure reason, present only once the job failed.
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            JobStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_free_text_contract() {
        assert_eq!(JobStatus::Queued.label(), "queued");
        assert_eq!(JobStatus::RequestingUploadUrl.label(), "requesting-upload-url");
        assert_eq!(JobStatus::Uploading { progress: 40 }.label(), "uploading");
        assert_eq!(JobStatus::Converting.label(), "converting");
        assert_eq!(JobStatus::Polling { remote_status: None }.label(), "polling");
        assert_eq!(
            JobStatus::Polling {
                remote_status: Some("processing".into())
            }
            .label(),
            "polling:processing"
        );
        assert_eq!(
            JobStatus::Completed {
                download_url: "https://x".into()
            }
            .label(),
            "completed"
        );
        assert_eq!(
            JobStatus::Failed {
                reason: FailureReason::RemoteFailed { detail: None }
            }
            .label(),
            "failed"
        );
    }

    #[test]
    fn terminal_and_in_flight() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Queued.is_in_flight());
        assert!(JobStatus::Converting.is_in_flight());
        let done = JobStatus::Completed {
            download_url: "u".into(),
        };
        assert!(done.is_terminal());
        assert!(!done.is_in_flight());
    }

    #[test]
    fn badges_from_variant() {
        assert_eq!(JobStatus::Queued.badge().category, BadgeCategory::Muted);
        assert_eq!(
            JobStatus::Polling {
                remote_status: Some("processing".into())
            }
            .badge()
            .label,
            "Processing"
        );
        let failed = JobStatus::Failed {
            reason: FailureReason::PollAttemptsExhausted { attempts: 1 },
        };
        assert_eq!(failed.badge().category, BadgeCategory::Danger);
    }

    #[test]
    fn record_accessors() {
        let mut r = JobRecord::queued(FileId(1), "part.step");
        assert_eq!(r.download_url(), None);
        r.status = JobStatus::Completed {
            download_url: "https://cdn/part.stl".into(),
        };
        assert_eq!(r.download_url(), Some("https://cdn/part.stl"));
        assert!(r.failure().is_none());
    }

    #[test]
    fn record_serialises_status_tag() {
        let r = JobRecord::queued(FileId(7), "a.obj");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["status"]["state"], "queued");
        assert!(json.get("job_id").is_none());
    }
}
