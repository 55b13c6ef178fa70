//! # c3d-convert
//!
//! Batch conversion of 3D model files (STL, STEP, OBJ, 3MF) through a remote
//! conversion service.
//!
//! ## Pipeline Overview
//!
//! Each submitted file runs through three remote phases, then a status poll:
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Upload url   POST /upload-url          → presigned upload location
//!  ├─ 2. Upload       PUT  <upload location>    → raw bytes, progress 0..100
//!  ├─ 3. Convert      POST /convert             → remote job id
//!  ├─ 4. Poll         GET  /status/{job}        → every 2 s until terminal
//!  └─ 5. Locate       GET  /download-url/{job}  → artifact url
//! ```
//!
//! Every state change lands on a per-file [`JobRecord`] held by the batch.
//! One file failing never stops the others.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use c3d_convert::{convert_files, BatchConfig, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder()
//!         .api_base_url("https://convert.example.com/api")
//!         .build()?;
//!     let report = convert_files(&["bracket.step", "gear.obj"], TargetFormat::Stl, &config).await?;
//!     for (record, url) in report.downloads() {
//!         println!("{} → {}", record.file_name, url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `c3d` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! c3d-convert = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod batch;
pub mod classify;
pub mod config;
pub mod convert;
pub mod error;
pub mod formats;
pub mod job;
pub mod pipeline;
pub mod progress;
pub mod remote;
pub mod report;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::save_artifact;
pub use batch::Batch;
pub use classify::{classify, BadgeCategory, StatusBadge};
pub use config::{BatchConfig, BatchConfigBuilder};
pub use convert::{convert_files, convert_files_sync};
pub use error::{ConvertError, FailureReason, Phase, RemoteError};
pub use formats::{artifact_file_name, TargetFormat};
pub use job::{FileId, JobRecord, JobStatus};
pub use pipeline::input::SubmittedFile;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use remote::{ConversionService, HttpConversionService, RemoteStatus, UploadProgressFn, UploadTarget};
pub use report::BatchReport;
