//! Upload module
//!
//! Data model and error taxonomy for the pre-signed upload workflow, plus the
//! orchestrator that runs size guard, storage transfer and backend
//! notification in sequence.

use bytes::Bytes;
use serde::Serialize;
use std::path::Path;
use size_guard::validate_file_size;
use thiserror::Error;

pub mod orchestrator;
pub mod size_guard;

pub use orchestrator::UploadClient;

/// Content type used when a file declares none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Upload errors
///
/// Each stage fails with its own variant; the orchestrator turns any of them
/// into a [`UploadOutcome::Failure`] carrying the display text.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{0}")]
    Validation(String),

    #[error("S3 upload failed: {0}")]
    StorageUpload(String),

    #[error("Failed to update invoice: {0}")]
    BackendNotify(String),

    #[error("Failed to obtain presigned URL: {0}")]
    Presign(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Short stage label used for metrics and logs
    pub fn stage(&self) -> &'static str {
        match self {
            UploadError::Validation(_) => "validation",
            UploadError::StorageUpload(_) => "storage",
            UploadError::BackendNotify(_) => "notify",
            UploadError::Presign(_) => "presign",
            UploadError::Io(_) => "io",
        }
    }
}

/// Reason phrase for a rejected HTTP response, e.g. `Forbidden`.
///
/// Codes without a registered phrase fall back to the numeric code.
pub(crate) fn status_text(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

/// A file selected for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub data: Bytes,
    pub content_type: Option<String>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            content_type: content_type.map(str::to_string),
        }
    }

    /// Read a local file.
    ///
    /// When `content_type` is `None` the type is guessed from the extension;
    /// unknown extensions leave it unset.
    pub async fn from_path<P: AsRef<Path>>(
        path: P,
        content_type: Option<&str>,
    ) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();

        let content_type = match content_type {
            Some(ct) => Some(ct.to_string()),
            None => mime_guess::from_path(path)
                .first()
                .map(|mime| mime.essence_str().to_string()),
        };

        Ok(Self {
            name,
            data: Bytes::from(data),
            content_type,
        })
    }

    /// Read a local file after checking its on-disk size against `max_bytes`.
    ///
    /// Oversized files fail with the size guard's message without being read.
    pub async fn from_path_checked<P: AsRef<Path>>(
        path: P,
        content_type: Option<&str>,
        max_bytes: u64,
    ) -> Result<Self, UploadError> {
        let len = tokio::fs::metadata(path.as_ref()).await?.len();
        validate_file_size(len, max_bytes)?;
        Self::from_path(path, content_type).await
    }

    /// Declared size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Content type sent to storage; empty or missing falls back to octet-stream
    pub fn effective_content_type(&self) -> &str {
        match self.content_type.as_deref() {
            Some(ct) if !ct.trim().is_empty() => ct,
            _ => DEFAULT_CONTENT_TYPE,
        }
    }
}

/// Inputs for one upload attempt
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Time-limited PUT URL issued by the backend
    pub presigned_url: String,
    /// Storage key assigned by the backend, e.g. `invoices/1/invoice.pdf`
    pub object_key: String,
    pub file: UploadFile,
    pub invoice_id: i64,
}

/// Result of one upload invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success { message: String, file_url: String },
    Failure { error: String },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }

    pub fn file_url(&self) -> Option<&str> {
        match self {
            UploadOutcome::Success { file_url, .. } => Some(file_url),
            UploadOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UploadOutcome::Success { .. } => None,
            UploadOutcome::Failure { error } => Some(error),
        }
    }
}

impl From<UploadError> for UploadOutcome {
    fn from(err: UploadError) -> Self {
        UploadOutcome::Failure {
            error: err.to_string(),
        }
    }
}

/// Wire shape: `{"success": true, "message", "file_url"}` or `{"success": false, "error"}`
#[derive(Serialize)]
struct OutcomeBody<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl Serialize for UploadOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            UploadOutcome::Success { message, file_url } => OutcomeBody {
                success: true,
                message: Some(message.as_str()),
                file_url: Some(file_url.as_str()),
                error: None,
            },
            UploadOutcome::Failure { error } => OutcomeBody {
                success: false,
                message: None,
                file_url: None,
                error: Some(error.as_str()),
            },
        };
        body.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_content_type_fallback() {
        let file = UploadFile::new("a.bin", vec![1u8, 2, 3], None);
        assert_eq!(file.effective_content_type(), "application/octet-stream");

        let file = UploadFile::new("a.bin", vec![1u8], Some(""));
        assert_eq!(file.effective_content_type(), "application/octet-stream");

        let file = UploadFile::new("a.pdf", vec![1u8], Some("application/pdf"));
        assert_eq!(file.effective_content_type(), "application/pdf");
        assert_eq!(file.size(), 1);
    }

    #[test]
    fn test_outcome_serializes_success_shape() {
        let outcome = UploadOutcome::Success {
            message: "ok".into(),
            file_url: "https://cdn/x".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "message": "ok", "file_url": "https://cdn/x"})
        );
    }

    #[test]
    fn test_outcome_serializes_failure_shape() {
        let outcome: UploadOutcome =
            UploadError::StorageUpload("Forbidden".into()).into();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "S3 upload failed: Forbidden"})
        );
        assert!(!outcome.is_success());
        assert!(outcome.file_url().is_none());
    }

    #[test]
    fn test_error_stage_labels() {
        assert_eq!(UploadError::Validation("x".into()).stage(), "validation");
        assert_eq!(UploadError::BackendNotify("x".into()).stage(), "notify");
    }

    #[tokio::test]
    async fn test_from_path_guesses_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let file = UploadFile::from_path(&path, None).await.unwrap();
        assert_eq!(file.name, "invoice.pdf");
        assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(file.size(), 8);

        let file = UploadFile::from_path(&path, Some("text/plain")).await.unwrap();
        assert_eq!(file.effective_content_type(), "text/plain");
    }

    #[tokio::test]
    async fn test_from_path_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.zzqx");
        std::fs::write(&path, b"data").unwrap();

        let file = UploadFile::from_path(&path, None).await.unwrap();
        assert!(file.content_type.is_none());
        assert_eq!(file.effective_content_type(), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_status_text_uses_reason_phrase() {
        assert_eq!(status_text(reqwest::StatusCode::FORBIDDEN), "Forbidden");
        assert_eq!(
            status_text(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            "Internal Server Error"
        );
        let unregistered = reqwest::StatusCode::from_u16(599).unwrap();
        assert_eq!(status_text(unregistered), "599");
    }

    #[tokio::test]
    async fn test_from_path_checked_rejects_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.pdf");
        // Sparse file: the length is set without writing any data
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(3 * 1024 * 1024 * 1024).unwrap();

        let err = UploadFile::from_path_checked(&path, None, 5 * 1024 * 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "File size exceeds 5MB. Current: 3072.00MB"
        );
    }

    #[tokio::test]
    async fn test_from_path_checked_accepts_file_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        std::fs::write(&path, vec![0u8; 1024]).unwrap();

        let file = UploadFile::from_path_checked(&path, None, 1024).await.unwrap();
        assert_eq!(file.size(), 1024);
        assert_eq!(file.effective_content_type(), "application/pdf");
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let result = UploadFile::from_path("/nonexistent/invoice.pdf", None).await;
        assert!(matches!(result, Err(UploadError::Io(_))));
    }
}
