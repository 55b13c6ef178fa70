//! Configuration for batch conversion runs.
//!
//! All orchestration behaviour is controlled through [`BatchConfig`], built
//! via its [`BatchConfigBuilder`]. The target format is deliberately *not*
//! here: it is batch state that the user may change between files, see
//! [`crate::batch::Batch::set_target_format`].

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::time::Duration;

/// Default interval between two status polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default polling budget: 900 polls at 2 s is 30 minutes.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 900;

/// Configuration for a batch conversion.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use c3d_convert::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .api_base_url("https://convert.example.com/api")
///     .concurrency(3)
///     .max_poll_attempts(Some(60))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Base url of the conversion API, without trailing slash.
    /// Default: `http://localhost:8000/api`.
    pub api_base_url: String,

    /// Wait between status polls in milliseconds. Default: 2000.
    pub poll_interval_ms: u64,

    /// Give up on a job after this many polls. `None` polls until the
    /// service reports a terminal status, however long that takes.
    /// Default: `Some(900)`.
    pub max_poll_attempts: Option<u32>,

    /// Maximum number of file pipelines in flight. Default: 1.
    ///
    /// At 1, file N+1 does not start until file N is terminal and remote calls
    /// never overlap across files. Higher values cut batch latency; each
    /// file's failures stay isolated either way.
    pub concurrency: usize,

    /// Timeout for the small JSON API calls, in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Timeout for a single byte upload, in seconds. Default: 600.
    pub upload_timeout_secs: u64,

    /// Size of each streamed upload chunk; progress is reported per chunk.
    /// Default: 64 KiB.
    pub upload_chunk_bytes: usize,

    /// Timeout for fetching a converted artifact, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional observer notified on every job record write.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
            concurrency: 1,
            request_timeout_secs: 60,
            upload_timeout_secs: 600,
            upload_chunk_bytes: 64 * 1024,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("api_base_url", &self.api_base_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("upload_chunk_bytes", &self.upload_chunk_bytes)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl fmt::Debug for BatchConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl BatchConfigBuilder {
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(1);
        self
    }

    /// `None` or `Some(0)` means unbounded polling.
    pub fn max_poll_attempts(mut self, attempts: Option<u32>) -> Self {
        self.config.max_poll_attempts = attempts.filter(|&n| n > 0);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs;
        self
    }

    pub fn upload_chunk_bytes(mut self, n: usize) -> Self {
        self.config.upload_chunk_bytes = n.max(1024);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, ConvertError> {
        let c = &self.config;
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(ConvertError::InvalidConfig(format!(
                "API base url must be http:// or https://, got '{}'",
                c.api_base_url
            )));
        }
        if c.concurrency == 0 {
            return Err(ConvertError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.request_timeout_secs == 0 || c.upload_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig("Timeouts must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}
