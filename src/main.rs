//! Invoice Uploadr - pre-signed upload client for invoice files
//!
//! Prints one JSON outcome per file on stdout; logs go to stderr.

use anyhow::bail;
use clap::Parser;
use futures::future::join_all;
use invoice_uploadr::{
    metrics, telemetry, Config, UploadClient, UploadFile, UploadOutcome, UploadRequest,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Invoice Uploadr - upload invoice files through pre-signed URLs
#[derive(Parser, Debug)]
#[command(name = "invoice-uploadr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file. Without it, INVOICE_API_URL and INVOICE_API_TOKEN are used
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence
    #[arg(short, long)]
    log_level: Option<String>,

    /// Invoice the files belong to
    #[arg(long)]
    invoice_id: i64,

    /// Pre-signed PUT URL. When omitted, one is requested from the backend per file
    #[arg(long, requires = "object_key")]
    presigned_url: Option<String>,

    /// Object key matching --presigned-url
    #[arg(long, requires = "presigned_url")]
    object_key: Option<String>,

    /// Content type override. Guessed from the file extension otherwise
    #[arg(long)]
    content_type: Option<String>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,

    /// Files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if let Some(level) = &args.log_level {
        config.logging.level = level.to_lowercase();
    }

    telemetry::init_subscriber(&config.logging)?;

    info!("Starting Invoice Uploadr v{}", invoice_uploadr::VERSION);

    if args.presigned_url.is_some() && args.files.len() != 1 {
        bail!("--presigned-url accepts exactly one file");
    }

    let client = UploadClient::from_config(&config)?;
    let invoice_id = args.invoice_id;
    let content_type = args.content_type.as_deref();
    let max_file_size = client.max_file_size();

    let outcomes: Vec<UploadOutcome> = match (&args.presigned_url, &args.object_key) {
        (Some(presigned_url), Some(object_key)) => {
            let file =
                UploadFile::from_path_checked(&args.files[0], content_type, max_file_size).await;
            let outcome = match file {
                Ok(file) => {
                    client
                        .upload(UploadRequest {
                            presigned_url: presigned_url.clone(),
                            object_key: object_key.clone(),
                            file,
                            invoice_id,
                        })
                        .await
                }
                Err(e) => e.into(),
            };
            vec![outcome]
        }
        _ => {
            // Independent uploads, one per file
            let uploads = args.files.iter().map(|path| {
                let client = &client;
                async move {
                    match UploadFile::from_path_checked(path, content_type, max_file_size).await {
                        Ok(file) => client.upload_with_presign(invoice_id, file).await,
                        Err(e) => e.into(),
                    }
                }
            });
            join_all(uploads).await
        }
    };

    for outcome in &outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }

    if args.metrics {
        eprint!("{}", metrics::gather_text());
    }

    if outcomes.iter().all(UploadOutcome::is_success) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
