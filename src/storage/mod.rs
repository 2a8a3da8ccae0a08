//! Object storage transfer
//!
//! Uploads bytes straight to a bucket through a pre-signed PUT URL. The URL
//! itself carries the authorization, so no credentials are held here.
//!
//! # Example
//!
//! ```no_run
//! use invoice_uploadr::storage::{StorageClient, StorageTransfer};
//! use bytes::Bytes;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = StorageClient::new(None)?;
//! client
//!     .put_object(
//!         "https://bucket.s3.amazonaws.com/invoices/1/invoice.pdf?X-Amz-Signature=...",
//!         Bytes::from_static(b"%PDF-1.4"),
//!         "application/pdf",
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Tracing
//!
//! | Operation | Span Name | Attributes |
//! |-----------|-----------|------------|
//! | PUT | `storage.put_object` | url (query stripped), method, bytes, content_type, status_code |

use crate::upload::{status_text, UploadError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Transfer of file bytes to object storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageTransfer: Send + Sync {
    /// PUT the whole payload to `presigned_url` with the given `Content-Type`.
    async fn put_object(
        &self,
        presigned_url: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), UploadError>;
}

/// Storage client backed by reqwest
#[derive(Debug, Clone)]
pub struct StorageClient {
    http_client: reqwest::Client,
}

impl StorageClient {
    /// Create a new storage client. `timeout` of `None` means no client-side timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self, UploadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| UploadError::StorageUpload(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Wrap an existing reqwest client
    pub fn with_http_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl StorageTransfer for StorageClient {
    #[tracing::instrument(
        name = "storage.put_object",
        skip(self, presigned_url, body),
        fields(
            storage.url = %redact_url(presigned_url),
            http.method = "PUT",
            upload.bytes = body.len(),
            http.content_type = %content_type,
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    async fn put_object(
        &self,
        presigned_url: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), UploadError> {
        let bytes = body.len();

        let response = self
            .http_client
            .put(presigned_url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::StorageUpload(e.without_url().to_string()))?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        if !status.is_success() {
            tracing::warn!(status = %status, "Storage rejected upload");
            return Err(UploadError::StorageUpload(status_text(status)));
        }

        tracing::info!(bytes = bytes, "Storage upload completed");
        Ok(())
    }
}

/// Strip the query string so signatures never reach the logs
pub fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}
