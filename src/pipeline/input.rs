//! Input resolution: turn a user-supplied path into a [`SubmittedFile`].
//!
//! The core never inspects file content; it only needs a name, the bytes and
//! a declared media type. Reading is done up front so a missing or unreadable
//! file is reported to the caller before any pipeline starts.

use crate::error::ConvertError;
use crate::formats::{content_type_for, infer_source_format};
use std::path::Path;
use tracing::debug;

/// A file accepted into a batch.
#[derive(Clone, PartialEq, Eq)]
pub struct SubmittedFile {
    /// File name as shown to the user and sent to the service.
    pub name: String,
    pub bytes: Vec<u8>,
    /// Media type used as the upload `Content-Type`.
    pub content_type: String,
    /// Explicit source format; inferred from `name` when `None`.
    pub source_format: Option<String>,
}

impl std::fmt::Debug for SubmittedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmittedFile")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("content_type", &self.content_type)
            .field("source_format", &self.source_format)
            .finish()
    }
}

impl SubmittedFile {
    /// A file with an explicitly declared media type.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            content_type: content_type.into(),
            source_format: None,
        }
    }

    /// A file whose media type is derived from its extension.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name);
        Self::new(name, bytes, content_type)
    }

    /// Override the inferred source format (lower-cased).
    pub fn with_source_format(mut self, format: impl AsRef<str>) -> Self {
        self.source_format = Some(format.as_ref().trim().to_ascii_lowercase());
        self
    }

    /// Source format sent with the conversion request. Empty means "let the
    /// service detect it".
    pub fn source_format(&self) -> String {
        self.source_format
            .clone()
            .unwrap_or_else(|| infer_source_format(&self.name))
    }

    /// Read a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ConvertError::InvalidInput {
                input: path.display().to_string(),
            })?;

        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConvertError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConvertError::FileRead {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::from_bytes(name, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn from_bytes_infers_content_type_and_source() {
        let f = SubmittedFile::from_bytes("Bracket.STEP", vec![1, 2, 3]);
        assert_eq!(f.content_type, "model/step");
        assert_eq!(f.source_format(), "step");
    }

    #[test]
    fn explicit_source_format_wins() {
        let f = SubmittedFile::from_bytes("scan", vec![]).with_source_format(" OBJ ");
        assert_eq!(f.source_format(), "obj");
        assert_eq!(f.content_type, "application/octet-stream");
    }

    #[test]
    fn missing_extension_yields_empty_source() {
        let f = SubmittedFile::new("model", vec![0], "application/octet-stream");
        assert_eq!(f.source_format(), "");
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let f = SubmittedFile::from_bytes("a.stl", vec![0; 4096]);
        let dbg = format!("{f:?}");
        assert!(dbg.contains("<4096 bytes>"), "got: {dbg}");
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let mut tmp = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        tmp.write_all(b"v 0 0 0\n").unwrap();

        let f = SubmittedFile::from_path(tmp.path()).await.unwrap();
        assert!(f.name.ends_with(".obj"));
        assert_eq!(f.bytes, b"v 0 0 0\n");
        assert_eq!(f.content_type, "model/obj");
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = SubmittedFile::from_path("/definitely/not/here.step")
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }
}
