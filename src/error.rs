//! Error types for the c3d-convert library.
//!
//! Three error types reflect three distinct failure surfaces:
//!
//! * [`ConvertError`] — **Fatal**: the batch cannot proceed at all (no files
//!   selected, unreadable input, invalid configuration, batch already
//!   running). Returned as `Err(ConvertError)` from the public entry points.
//!
//! * [`FailureReason`] — **Non-fatal**: a single file failed (transport error,
//!   remote conversion failure, stuck job) but the rest of the batch is fine.
//!   Stored inside [`crate::job::JobStatus::Failed`] so callers can inspect
//!   mixed outcomes rather than losing the whole batch to one bad file.
//!
//! * [`RemoteError`] — what a [`crate::remote::ConversionService`] call
//!   returns. The pipeline folds it into a [`FailureReason`] tagged with the
//!   [`Phase`] that raised it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the c3d-convert library.
///
/// Per-file failures use [`FailureReason`] and are stored on the job record
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Conversion was requested with an empty submission queue.
    #[error("No files selected.\nAdd at least one file before starting the conversion.")]
    EmptyBatch,

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path has no usable file name component.
    #[error("Invalid input '{input}': path has no file name")]
    InvalidInput { input: String },

    /// The requested target format is not part of the catalog.
    #[error("Unsupported format '{0}'. Supported: stl, step, stp, obj, 3mf")]
    UnknownFormat(String),

    // ── Batch state errors ────────────────────────────────────────────────
    /// The batch cannot be cleared while pipelines are in flight.
    #[error("Batch is busy: {in_flight} file(s) still in progress")]
    BatchBusy { in_flight: usize },

    /// `run` was called while a previous `run` on the same batch is active.
    #[error("Batch is already running")]
    BatchRunning,

    // ── Artifact errors ───────────────────────────────────────────────────
    /// The converted artifact could not be fetched.
    #[error("Failed to download '{url}': {reason}")]
    ArtifactDownloadFailed { url: String, reason: String },

    /// The artifact download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    ArtifactDownloadTimeout { url: String, secs: u64 },

    /// Could not create or write the artifact file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to initialise HTTP client: {0}")]
    HttpClient(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The remote call a per-file failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    UploadLocation,
    Upload,
    ConversionRequest,
    StatusQuery,
    DownloadReference,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::UploadLocation => "upload-location request",
            Phase::Upload => "upload",
            Phase::ConversionRequest => "conversion request",
            Phase::StatusQuery => "status query",
            Phase::DownloadReference => "download-url request",
        };
        f.write_str(s)
    }
}

/// Why a single file ended in the `failed` state.
///
/// A thrown transport error and a remote `failed` status are kept apart so
/// user messaging can tell "the service rejected the model" from "the network
/// dropped". Both still render the status label `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// A call to the conversion service failed.
    #[error("{phase} failed: {detail}")]
    Transport { phase: Phase, detail: String },

    /// The service reported the conversion job as failed.
    #[error("remote conversion failed{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    RemoteFailed { detail: Option<String> },

    /// The job never reached a terminal status within the polling budget.
    #[error("job still not terminal after {attempts} status polls")]
    PollAttemptsExhausted { attempts: u32 },

    /// The batch run driving this file was dropped before the file finished.
    /// Remote calls already issued are not undone.
    #[error("batch run cancelled while the file was in progress")]
    Cancelled,
}

impl FailureReason {
    /// Wrap a service error with the phase it occurred in.
    pub fn transport(phase: Phase, err: RemoteError) -> Self {
        FailureReason::Transport {
            phase,
            detail: err.to_string(),
        }
    }
}

/// Errors returned by a [`crate::remote::ConversionService`].
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a response (DNS, TLS, connect, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// Any other failure, e.g. from a non-HTTP service implementation.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_display() {
        let msg = ConvertError::EmptyBatch.to_string();
        assert!(msg.contains("No files selected"), "got: {msg}");
    }

    #[test]
    fn batch_busy_display() {
        let e = ConvertError::BatchBusy { in_flight: 2 };
        assert!(e.to_string().contains("2 file(s)"));
    }

    #[test]
    fn transport_reason_names_phase() {
        let reason = FailureReason::transport(
            Phase::UploadLocation,
            RemoteError::Status {
                status: 500,
                message: "boom".into(),
            },
        );
        let msg = reason.to_string();
        assert!(msg.contains("upload-location request"), "got: {msg}");
        assert!(msg.contains("HTTP 500: boom"), "got: {msg}");
    }

    #[test]
    fn remote_failed_display_with_and_without_detail() {
        let with = FailureReason::RemoteFailed {
            detail: Some("No shape found".into()),
        };
        assert_eq!(with.to_string(), "remote conversion failed: No shape found");

        let without = FailureReason::RemoteFailed { detail: None };
        assert_eq!(without.to_string(), "remote conversion failed");
    }

    #[test]
    fn failure_reason_serialises_with_kind_tag() {
        let reason = FailureReason::PollAttemptsExhausted { attempts: 3 };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "poll_attempts_exhausted");
        assert_eq!(json["attempts"], 3);
    }
}
