//! Objects reported by a storage backend listing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One object as seen on the remote.
///
/// Only produced by backend list or metadata calls and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Backend-relative key, `{root}/configs/{category}/{filename}`.
    pub key: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Content SHA-256 when the backend can report one.
    pub checksum: Option<String>,
}

impl RemoteObject {
    /// Final path segment of the key.
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}
