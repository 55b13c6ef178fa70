//! One-shot conversion entry points.
//!
//! [`convert_files`] is the simpler API: read every path, run one batch
//! against the HTTP service, return the report. Use [`crate::batch::Batch`]
//! directly when files arrive incrementally, when a file may be withdrawn
//! mid-run, or when a different [`ConversionService`] is needed.

use crate::batch::Batch;
use crate::config::BatchConfig;
use crate::error::ConvertError;
use crate::formats::TargetFormat;
use crate::pipeline::input::SubmittedFile;
use crate::remote::{ConversionService, HttpConversionService};
use crate::report::BatchReport;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Convert local files to `target` through the configured service.
///
/// # Returns
/// `Ok(BatchReport)` once every file reached a terminal state, even if some
/// failed (check `report.failed`).
///
/// # Errors
/// Returns `Err(ConvertError)` only for fatal errors, before any upload:
/// - no paths given
/// - a file is missing or unreadable
/// - the configuration or HTTP client is invalid
pub async fn convert_files<P: AsRef<Path>>(
    paths: &[P],
    target: TargetFormat,
    config: &BatchConfig,
) -> Result<BatchReport, ConvertError> {
    if paths.is_empty() {
        return Err(ConvertError::EmptyBatch);
    }

    // Read everything first so a bad path aborts before any remote call.
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(SubmittedFile::from_path(path).await?);
    }

    let service: Arc<dyn ConversionService> = Arc::new(HttpConversionService::from_config(config)?);
    info!("Converting {} file(s) via {}", files.len(), config.api_base_url);

    let batch = Batch::new(service, config.clone(), target);
    for file in files {
        batch.submit(file);
    }
    batch.run().await
}

/// Synchronous wrapper around [`convert_files`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_files_sync<P: AsRef<Path>>(
    paths: &[P],
    target: TargetFormat,
    config: &BatchConfig,
) -> Result<BatchReport, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_files(paths, target, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_paths_is_empty_batch() {
        let paths: [&str; 0] = [];
        let err = convert_files(&paths, TargetFormat::Stl, &BatchConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::EmptyBatch));
    }

    #[tokio::test]
    async fn missing_file_aborts_before_any_request() {
        // Unroutable base url: reaching the network would fail differently.
        let config = BatchConfig::builder()
            .api_base_url("http://127.0.0.1:9/api")
            .build()
            .unwrap();
        let err = convert_files(&["/no/such/part.step"], TargetFormat::Obj, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }
}
