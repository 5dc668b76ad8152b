//! Scheduled transfers and conflict resolutions

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::file::TrackedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upload,
    Download,
    Skip,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
            Direction::Skip => write!(f, "skip"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Failed | OperationStatus::Skipped
        )
    }
}

/// One scheduled transfer.
///
/// An operation moves forward only: once it is completed, failed, or
/// skipped, further transitions are ignored. Failed operations are not
/// retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: Uuid,
    pub file: TrackedFile,
    pub direction: Direction,
    pub status: OperationStatus,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Operation {
    pub fn new(file: TrackedFile, direction: Direction) -> Self {
        Self {
            id: Uuid::new_v4(),
            file,
            direction,
            status: OperationStatus::Pending,
            created: Utc::now(),
            error: None,
        }
    }

    pub fn start(&mut self) -> bool {
        self.transition(OperationStatus::InProgress)
    }

    pub fn complete(&mut self) -> bool {
        self.transition(OperationStatus::Completed)
    }

    pub fn skip(&mut self) -> bool {
        self.transition(OperationStatus::Skipped)
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        let moved = self.transition(OperationStatus::Failed);
        if moved {
            self.error = Some(message.into());
        }
        moved
    }

    /// Move to `next` unless already terminal. Returns whether the status changed.
    fn transition(&mut self, next: OperationStatus) -> bool {
        if self.status.is_terminal() {
            tracing::debug!(
                file = %self.file.filename,
                from = ?self.status,
                to = ?next,
                "Ignoring transition out of terminal state"
            );
            return false;
        }
        self.status = next;
        true
    }
}

/// How the user chose to settle a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictResolution {
    UseLocal,
    UseRemote,
    /// Hand both versions to an external editor; the engine does nothing further.
    Merge,
    Skip,
}

impl FromStr for ConflictResolution {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "use-local" | "uselocal" => Ok(ConflictResolution::UseLocal),
            "remote" | "use-remote" | "useremote" => Ok(ConflictResolution::UseRemote),
            "merge" => Ok(ConflictResolution::Merge),
            "skip" => Ok(ConflictResolution::Skip),
            _ => Err(Error::InvalidResolution {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictResolution::UseLocal => write!(f, "local"),
            ConflictResolution::UseRemote => write!(f, "remote"),
            ConflictResolution::Merge => write!(f, "merge"),
            ConflictResolution::Skip => write!(f, "skip"),
        }
    }
}
