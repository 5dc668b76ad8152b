//! Per-file reconciliation status

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::file::TrackedFile;

/// Drift state of one tracked file against the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    Synced,
    LocalNewer,
    RemoteNewer,
    Conflict,
    NotOnRemote,
    NotOnLocal,
    Error,
}

impl SyncState {
    /// Whether this state calls for an upload on a push.
    pub fn wants_upload(&self) -> bool {
        matches!(self, SyncState::LocalNewer | SyncState::NotOnRemote)
    }

    /// Whether this state calls for a download on a pull.
    pub fn wants_download(&self) -> bool {
        matches!(self, SyncState::RemoteNewer | SyncState::NotOnLocal)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncState::Synced => "synced",
            SyncState::LocalNewer => "local-newer",
            SyncState::RemoteNewer => "remote-newer",
            SyncState::Conflict => "conflict",
            SyncState::NotOnRemote => "not-on-remote",
            SyncState::NotOnLocal => "not-on-local",
            SyncState::Error => "error",
        };
        f.write_str(label)
    }
}

/// Classification result for one file in a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub file: TrackedFile,
    pub local_modified: Option<DateTime<Utc>>,
    pub remote_modified: Option<DateTime<Utc>>,
    pub state: SyncState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncStatus {
    pub fn new(file: TrackedFile, state: SyncState) -> Self {
        Self {
            local_modified: Some(file.modified),
            file,
            remote_modified: None,
            state,
            error: None,
        }
    }

    pub fn failed(file: TrackedFile, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(file, SyncState::Error)
        }
    }
}
