//! Results and published state of the engine

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use dots_meta::{Operation, OperationStatus, RemoteObject, SyncState, SyncStatus};
use serde::Serialize;

/// Options for transfer batches
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// If true, simulate transfers without touching the backend or local files.
    /// Actions will be prefixed with "[dry-run] Would ..."
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Outcome of one transfer batch
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Whether every file in the batch transferred
    pub success: bool,
    /// One operation per file that entered the batch
    pub operations: Vec<Operation>,
    /// Human-readable actions taken
    pub actions: Vec<String>,
    /// Per-file errors
    pub errors: Vec<String>,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self {
            success: true,
            operations: Vec::new(),
            actions: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl SyncReport {
    pub fn completed(&self) -> usize {
        self.count(OperationStatus::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(OperationStatus::Failed)
    }

    fn count(&self, status: OperationStatus) -> usize {
        self.operations.iter().filter(|op| op.status == status).count()
    }
}

/// Consistent view of engine state, published between passes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineSnapshot {
    pub statuses: Vec<SyncStatus>,
    pub is_syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
    /// Remote objects that no tracked file maps to.
    pub remote_only: Vec<RemoteObject>,
    /// False when the backend cannot report checksums and conflicts are
    /// detected from timestamps alone.
    pub checksum_comparison: bool,
}

impl EngineSnapshot {
    pub fn in_state(&self, state: SyncState) -> impl Iterator<Item = &SyncStatus> {
        self.statuses.iter().filter(move |s| s.state == state)
    }

    pub fn conflicts(&self) -> Vec<SyncStatus> {
        self.in_state(SyncState::Conflict).cloned().collect()
    }
}

/// What a conflict resolution did.
#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    /// The local or remote copy was transferred over the other.
    Transferred(SyncReport),
    /// Nothing happened; the file stays in conflict.
    Skipped,
    /// Both versions should be opened in an external merge tool.
    MergeRequested { local: PathBuf, remote_key: String },
}
