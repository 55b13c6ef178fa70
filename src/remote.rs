//! Conversion service contract and its HTTP binding.
//!
//! The pipeline only ever talks to a [`ConversionService`]. That keeps the
//! state machine testable with a scripted in-memory service and lets callers
//! plug in other transports.
//!
//! ## HTTP routes
//!
//! ```text
//! POST {base}/upload-url          {"fileName"}                      → {"uploadUrl", "jobId"?}
//! PUT  {uploadUrl}                raw bytes
//! POST {base}/convert             {"fileName","sourceFormat","targetFormat"} → {"jobId"}
//! GET  {base}/status/{jobId}                                          → {"status", "error"?}
//! GET  {base}/download-url/{jobId}                                    → {"downloadUrl"}
//! ```

use crate::config::BatchConfig;
use crate::error::{ConvertError, RemoteError};
use async_trait::async_trait;
use futures::stream;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Remote status value that ends polling successfully.
pub const STATUS_COMPLETED: &str = "completed";
/// Remote status value that ends polling with a failure.
pub const STATUS_FAILED: &str = "failed";

/// Upload progress sink: `(bytes_sent, total_bytes)`.
pub type UploadProgressFn = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Percentage for an upload progress notification.
///
/// An unknown or zero total is treated as 1 byte, reported as 0%.
pub fn progress_percent(sent: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => {
            let pct = (sent as f64 * 100.0 / total as f64).round();
            pct.clamp(0.0, 100.0) as u8
        }
        _ => 0,
    }
}

/// Write destination issued for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
    /// Some deployments pre-allocate the job id with the upload url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// One status poll answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub status: String,
    /// Failure detail reported alongside `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemoteStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED
    }

    pub fn is_terminal(&self) -> bool {
        self.is_completed() || self.is_failed()
    }
}

/// The remote conversion service as seen by the pipeline.
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Ask for a write destination for `file_name`.
    async fn request_upload_url(&self, file_name: &str) -> Result<UploadTarget, RemoteError>;

    /// Transfer `body` to `target`, calling `progress` as bytes go out.
    async fn upload(
        &self,
        target: &UploadTarget,
        body: Vec<u8>,
        content_type: &str,
        progress: UploadProgressFn,
    ) -> Result<(), RemoteError>;

    /// Start converting the uploaded file; returns the job id.
    async fn request_conversion(
        &self,
        file_name: &str,
        source_format: &str,
        target_format: &str,
    ) -> Result<String, RemoteError>;

    /// Query the status of a conversion job.
    async fn job_status(&self, job_id: &str) -> Result<RemoteStatus, RemoteError>;

    /// Locator for the converted artifact. Only valid after `completed`.
    async fn download_url(&self, job_id: &str) -> Result<String, RemoteError>;
}

// ── HTTP binding ──────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlRequest<'a> {
    file_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConvertRequest<'a> {
    file_name: &'a str,
    source_format: &'a str,
    target_format: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertResponse {
    job_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadUrlResponse {
    download_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// [`ConversionService`] over the JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpConversionService {
    client: reqwest::Client,
    base_url: String,
    upload_timeout: Duration,
    chunk_bytes: usize,
}

impl HttpConversionService {
    /// Build a client for `config.api_base_url` using the configured timeouts.
    pub fn from_config(config: &BatchConfig) -> Result<Self, ConvertError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConvertError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            upload_timeout: config.upload_timeout(),
            chunk_bytes: config.upload_chunk_bytes.max(1),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a non-2xx response into [`RemoteError::Status`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body
                }
            });
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
        let bytes = Self::check(response).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn request_upload_url(&self, file_name: &str) -> Result<UploadTarget, RemoteError> {
        let response = self
            .client
            .post(self.endpoint("upload-url"))
            .json(&UploadUrlRequest { file_name })
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn upload(
        &self,
        target: &UploadTarget,
        body: Vec<u8>,
        content_type: &str,
        progress: UploadProgressFn,
    ) -> Result<(), RemoteError> {
        let total = body.len() as u64;
        let chunks: Vec<Vec<u8>> = body.chunks(self.chunk_bytes).map(<[u8]>::to_vec).collect();
        debug!("Uploading {} bytes in {} chunks", total, chunks.len());

        // Progress is reported as hyper pulls each chunk off the stream.
        let sink = Arc::clone(&progress);
        let mut sent = 0u64;
        let body_stream = stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            sink(sent, Some(total));
            Ok::<_, std::io::Error>(chunk)
        }));

        let response = self
            .client
            .put(&target.upload_url)
            .timeout(self.upload_timeout)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body_stream))
            .send()
            .await?;
        Self::check(response).await?;

        progress(total, Some(total));
        Ok(())
    }

    async fn request_conversion(
        &self,
        file_name: &str,
        source_format: &str,
        target_format: &str,
    ) -> Result<String, RemoteError> {
        let response = self
            .client
            .post(self.endpoint("convert"))
            .json(&ConvertRequest {
                file_name,
                source_format,
                target_format,
            })
            .send()
            .await?;
        let body: ConvertResponse = Self::decode(response).await?;
        Ok(body.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<RemoteStatus, RemoteError> {
        let response = self
            .client
            .get(self.endpoint(&format!("status/{job_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn download_url(&self, job_id: &str) -> Result<String, RemoteError> {
        let response = self
            .client
            .get(self.endpoint(&format!("download-url/{job_id}")))
            .send()
            .await?;
        let body: DownloadUrlResponse = Self::decode(response).await?;
        Ok(body.download_url)
    }
}
