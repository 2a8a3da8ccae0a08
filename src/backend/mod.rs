//! Invoice backend API client
//!
//! Two endpoints under the configured base URL, both with bearer auth:
//!
//! - `POST /get-presigned-url/` asks the backend for a pre-signed PUT URL
//! - `POST /update-invoice-file/` records a finished upload and returns a
//!   durable download URL

use crate::config::BackendConfig;
use crate::upload::{status_text, UploadError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const PRESIGN_PATH: &str = "/get-presigned-url/";
const NOTIFY_PATH: &str = "/update-invoice-file/";

/// Body of the upload-complete notification
#[derive(Debug, Clone, Serialize)]
pub struct NotifyRequest<'a> {
    pub invoice_id: i64,
    pub object_key: &'a str,
}

/// Backend reply to the notification.
///
/// Fields are not validated: `message` and `file_url` accept any JSON value,
/// anything missing deserializes as `None` and unknown fields are kept in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotifyResponse {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub file_url: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl NotifyResponse {
    /// `message` as text; empty when missing or null
    pub fn message_text(&self) -> String {
        value_text(self.message.as_ref())
    }

    /// `file_url` as text; empty when missing or null
    pub fn file_url_text(&self) -> String {
        value_text(self.file_url.as_ref())
    }
}

/// Strings are taken as-is, other values are rendered as compact JSON
fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Body of the pre-signed URL request
#[derive(Debug, Clone, Serialize)]
pub struct PresignRequest<'a> {
    pub invoice_id: i64,
    pub filename: &'a str,
}

/// Pre-signed upload slot issued by the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresignedUpload {
    pub presigned_url: String,
    pub object_key: String,
    pub invoice_id: i64,
}

/// Invoice backend operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Tell the backend that `object_key` now holds the file for `invoice_id`.
    async fn notify_upload_complete(
        &self,
        invoice_id: i64,
        object_key: &str,
    ) -> Result<NotifyResponse, UploadError>;

    /// Ask the backend for a pre-signed PUT URL for `filename`.
    async fn request_presigned_url(
        &self,
        invoice_id: i64,
        filename: &str,
    ) -> Result<PresignedUpload, UploadError>;
}

/// HTTP client for the invoice backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        token: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, UploadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| UploadError::BackendNotify(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Create a client from the `backend` config section
    pub fn from_config(config: &BackendConfig) -> Result<Self, UploadError> {
        Self::new(
            &config.base_url,
            &config.token,
            config.timeout_seconds.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body with bearer auth and decode the JSON reply.
    /// Every failure is mapped through `map_err` so each endpoint keeps its own variant.
    async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        map_err: fn(String) -> UploadError,
    ) -> Result<T, UploadError>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.build_url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| map_err(e.without_url().to_string()))?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        if !status.is_success() {
            tracing::warn!(status = %status, path = path, "Backend request rejected");
            return Err(map_err(status_text(status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_err(e.without_url().to_string()))?;
        serde_json::from_slice(&body)
            .map_err(|e| map_err(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl BackendApi for BackendClient {
    #[tracing::instrument(
        name = "backend.notify_upload_complete",
        skip(self),
        fields(
            invoice.id = invoice_id,
            storage.key = %object_key,
            http.method = "POST",
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    async fn notify_upload_complete(
        &self,
        invoice_id: i64,
        object_key: &str,
    ) -> Result<NotifyResponse, UploadError> {
        let body = NotifyRequest {
            invoice_id,
            object_key,
        };
        let response: NotifyResponse = self
            .post_json(NOTIFY_PATH, &body, UploadError::BackendNotify)
            .await?;

        tracing::info!(file_url = %response.file_url_text(), "Invoice updated with file");
        Ok(response)
    }

    #[tracing::instrument(
        name = "backend.request_presigned_url",
        skip(self),
        fields(
            invoice.id = invoice_id,
            file.name = %filename,
            http.method = "POST",
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    async fn request_presigned_url(
        &self,
        invoice_id: i64,
        filename: &str,
    ) -> Result<PresignedUpload, UploadError> {
        let body = PresignRequest {
            invoice_id,
            filename,
        };
        let slot: PresignedUpload = self
            .post_json(PRESIGN_PATH, &body, UploadError::Presign)
            .await?;

        tracing::debug!(object_key = %slot.object_key, "Received presigned URL");
        Ok(slot)
    }
}
