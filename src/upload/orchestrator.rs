//! Upload orchestrator
//!
//! Runs size guard, storage PUT and backend notification strictly in order.
//! This is the single recovery boundary: every stage error becomes an
//! [`UploadOutcome::Failure`].
//!
//! A storage success followed by a failed notification is reported as a
//! failure and the stored object is left in place.
//!
//! # Example
//!
//! ```no_run
//! use invoice_uploadr::config::Config;
//! use invoice_uploadr::upload::{UploadClient, UploadFile, UploadRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.yaml")?;
//! let client = UploadClient::from_config(&config)?;
//!
//! let request = UploadRequest {
//!     presigned_url: "https://bucket.s3.amazonaws.com/invoices/1/invoice.pdf?X-Amz-Signature=...".into(),
//!     object_key: "invoices/1/invoice.pdf".into(),
//!     file: UploadFile::from_path("invoice.pdf", None).await?,
//!     invoice_id: 1,
//! };
//!
//! let outcome = client.upload(request).await;
//! if let Some(url) = outcome.file_url() {
//!     println!("Download URL: {}", url);
//! }
//! # Ok(())
//! # }
//! ```

use super::size_guard::validate_file_size;
use super::{UploadError, UploadFile, UploadOutcome, UploadRequest};
use crate::backend::{BackendApi, BackendClient, NotifyResponse};
use crate::config::{Config, DEFAULT_MAX_FILE_SIZE};
use crate::metrics;
use crate::storage::{redact_url, StorageClient, StorageTransfer};
use std::time::{Duration, Instant};

/// Client-side upload workflow
pub struct UploadClient<S = StorageClient, B = BackendClient> {
    storage: S,
    backend: B,
    max_file_size: u64,
}

impl UploadClient<StorageClient, BackendClient> {
    /// Build reqwest-backed storage and backend clients from configuration
    pub fn from_config(config: &Config) -> Result<Self, UploadError> {
        let storage = StorageClient::new(config.storage.timeout_seconds.map(Duration::from_secs))?;
        let backend = BackendClient::from_config(&config.backend)?;
        Ok(Self::new(storage, backend).with_max_file_size(config.upload.max_file_size))
    }
}

impl<S, B> UploadClient<S, B>
where
    S: StorageTransfer,
    B: BackendApi,
{
    pub fn new(storage: S, backend: B) -> Self {
        Self {
            storage,
            backend,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Upload a file and notify the backend, returning a uniform outcome.
    pub async fn upload(&self, request: UploadRequest) -> UploadOutcome {
        let bytes = request.file.size();
        let start_time = Instant::now();
        let result = self.try_upload(request).await;
        self.finish(result, bytes, start_time)
    }

    /// Same sequence as [`upload`](Self::upload), with typed errors.
    #[tracing::instrument(
        name = "upload.run",
        skip(self, request),
        fields(
            invoice.id = request.invoice_id,
            storage.key = %request.object_key,
            file.name = %request.file.name,
            upload.bytes = request.file.size()
        )
    )]
    pub async fn try_upload(&self, request: UploadRequest) -> Result<NotifyResponse, UploadError> {
        validate_file_size(request.file.size(), self.max_file_size)?;

        self.transfer(&request.presigned_url, &request.file).await?;

        let notify_start = Instant::now();
        let response = self
            .backend
            .notify_upload_complete(request.invoice_id, &request.object_key)
            .await;
        metrics::record_stage_duration("notify", notify_start.elapsed().as_secs_f64());

        response
    }

    /// Request a pre-signed URL from the backend, then run the upload.
    ///
    /// The size check still happens before any network call.
    pub async fn upload_with_presign(&self, invoice_id: i64, file: UploadFile) -> UploadOutcome {
        let bytes = file.size();
        let start_time = Instant::now();

        let result: Result<NotifyResponse, UploadError> = async {
            validate_file_size(file.size(), self.max_file_size)?;

            let presign_start = Instant::now();
            let slot = self
                .backend
                .request_presigned_url(invoice_id, &file.name)
                .await;
            metrics::record_stage_duration("presign", presign_start.elapsed().as_secs_f64());
            let slot = slot?;

            tracing::debug!(
                url = %redact_url(&slot.presigned_url),
                object_key = %slot.object_key,
                "Presigned slot issued"
            );

            self.try_upload(UploadRequest {
                presigned_url: slot.presigned_url,
                object_key: slot.object_key,
                file,
                invoice_id,
            })
            .await
        }
        .await;

        self.finish(result, bytes, start_time)
    }

    async fn transfer(&self, presigned_url: &str, file: &UploadFile) -> Result<(), UploadError> {
        let start = Instant::now();
        let result = self
            .storage
            .put_object(
                presigned_url,
                file.data.clone(),
                file.effective_content_type(),
            )
            .await;
        metrics::record_stage_duration("storage", start.elapsed().as_secs_f64());
        result
    }

    fn finish(
        &self,
        result: Result<NotifyResponse, UploadError>,
        bytes: u64,
        start_time: Instant,
    ) -> UploadOutcome {
        let duration = start_time.elapsed();

        match result {
            Ok(response) => {
                metrics::record_upload_success(bytes);
                tracing::info!(
                    bytes = bytes,
                    duration_ms = duration.as_millis(),
                    "Upload completed"
                );
                UploadOutcome::Success {
                    message: response.message_text(),
                    file_url: response.file_url_text(),
                }
            }
            Err(e) => {
                metrics::record_upload_failure();
                metrics::record_error(e.stage());
                tracing::error!(
                    error = %e,
                    stage = e.stage(),
                    duration_ms = duration.as_millis(),
                    "Upload failed"
                );
                e.into()
            }
        }
    }
}
