//! Fingerprint Catalog for dotsync
//!
//! Scans a root directory against a declarative pattern table and builds
//! [`TrackedFile`](dots_meta::TrackedFile) records: content hash, category,
//! priority, and safety flag. Scanning never mutates files.

pub mod error;
pub mod patterns;
pub mod priority;
pub mod scan;

pub use error::{Error, Result};
pub use patterns::{PatternEntry, PatternTable, default_excludes};
pub use priority::priority_for;
pub use scan::Catalog;
