//! File size ceiling check, run before any network call.

use super::UploadError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Reject files larger than `max_bytes`.
///
/// A file of exactly `max_bytes` passes.
pub fn validate_file_size(len: u64, max_bytes: u64) -> Result<(), UploadError> {
    if len > max_bytes {
        return Err(UploadError::Validation(format!(
            "File size exceeds {}MB. Current: {:.2}MB",
            format_limit(max_bytes),
            len as f64 / BYTES_PER_MB
        )));
    }
    Ok(())
}

/// Whole MiB limits print without decimals ("5"), others with two ("0.50")
fn format_limit(max_bytes: u64) -> String {
    let mb = max_bytes as f64 / BYTES_PER_MB;
    if mb.fract() == 0.0 {
        format!("{}", mb as u64)
    } else {
        format!("{:.2}", mb)
    }
}
