//! Fetch a converted artifact from its download url and write it to disk.
//!
//! The write is atomic (temp file + rename), so an interrupted download never
//! leaves a partial artifact at the destination.

use crate::error::ConvertError;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Download `url` to `dest`. Returns the number of bytes written.
///
/// # Errors
/// - [`ConvertError::ArtifactDownloadTimeout`] if the request exceeds `timeout_secs`
/// - [`ConvertError::ArtifactDownloadFailed`] on transport errors or a non-2xx status
/// - [`ConvertError::OutputWriteFailed`] if `dest` cannot be written
pub async fn save_artifact(
    url: &str,
    dest: impl AsRef<Path>,
    timeout_secs: u64,
) -> Result<u64, ConvertError> {
    let dest = dest.as_ref();
    info!("Downloading artifact: {} → {}", url, dest.display());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConvertError::HttpClient(e.to_string()))?;

    let map_transport = |e: reqwest::Error| {
        if e.is_timeout() {
            ConvertError::ArtifactDownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ConvertError::ArtifactDownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_transport)?;
    if !response.status().is_success() {
        return Err(ConvertError::ArtifactDownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }
    let bytes = response.bytes().await.map_err(map_transport)?;

    let write_err = |e: std::io::Error| ConvertError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source: e,
    };
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = dest.as_os_str().to_owned();
    tmp_name.push(".part");
    let tmp_path = std::path::PathBuf::from(tmp_name);
    let written = match tokio::fs::write(&tmp_path, &bytes).await {
        Ok(()) => tokio::fs::rename(&tmp_path, dest).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            debug!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_err(e));
    }

    Ok(bytes.len() as u64)
}
