//! Filesystem primitives for dotsync
//!
//! Provides normalized paths, SHA-256 fingerprints, atomic writes,
//! coordinated (exclusive) access to shared directories, and
//! format-agnostic configuration loading.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::{compute_bytes_checksum, compute_file_checksum};
pub use config::ConfigStore;
pub use error::{Error, Result};
pub use io::CoordinationGuard;
pub use path::NormalizedPath;
