//! Invoice Uploadr Library
//!
//! Uploads invoice files straight to object storage through pre-signed URLs,
//! then registers the stored object with the invoice backend.
//!
//! # Workflow
//!
//! 1. **Size guard**: files over 5 MiB are rejected before any network call
//! 2. **Storage transfer**: `PUT` to the pre-signed URL with the file's content type
//! 3. **Backend notification**: `POST /update-invoice-file/` returns the durable file URL
//!
//! Any failure becomes a uniform [`UploadOutcome::Failure`]; nothing is retried.
//!
//! # Example
//!
//! ```no_run
//! use invoice_uploadr::{Config, UploadClient, UploadFile};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let client = UploadClient::from_config(&config)?;
//!     let file = UploadFile::from_path("invoice.pdf", None).await?;
//!     let outcome = client.upload_with_presign(1, file).await;
//!     println!("{}", serde_json::to_string(&outcome)?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod metrics;
pub mod storage;
pub mod telemetry;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use upload::{UploadClient, UploadError, UploadFile, UploadOutcome, UploadRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
