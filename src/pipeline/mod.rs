//! Per-file conversion pipeline.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ run: upload-url ──▶ upload ──▶ convert ──▶ poll ──▶ download-url
//! (path)          (service)     (bytes)    (job id)   (status)   (locator)
//! ```
//!
//! 1. [`input`] — read a user-supplied path into a [`input::SubmittedFile`]
//! 2. [`run`]   — the three remote phases plus the download-url request, with
//!    failure containment at the file boundary
//! 3. [`poll`]  — the fixed-interval status loop used by [`run`]

pub mod input;
pub mod poll;
pub mod run;
