//! Safety Gate for dotsync
//!
//! Every file is checked here before it may enter a network path. The gate
//! is content-only: filename-based exclusion happens earlier, in the catalog.
//!
//! Known limitation: files over [`MAX_SCAN_BYTES`] are reported as safe
//! without being read.

pub mod error;
mod gate;
mod patterns;
mod sanitize;

pub use error::{Error, Result};
pub use gate::{CredentialFinding, MAX_SCAN_BYTES, SafetyGate, is_text_file};
pub use sanitize::sanitize;
