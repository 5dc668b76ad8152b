//! SHA-256 fingerprint utilities
//!
//! Tracked files are fingerprinted with a plain lowercase hex SHA-256 digest
//! over their full content. The same digest is attached to uploaded objects
//! as metadata, so local and remote fingerprints compare directly.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Compute the SHA-256 hex digest of a byte slice.
pub fn compute_bytes_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 hex digest of a file's full contents.
///
/// The whole file is read into memory; large files are not streamed.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_file_checksum(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read(path)?;
    Ok(compute_bytes_checksum(&content))
}
