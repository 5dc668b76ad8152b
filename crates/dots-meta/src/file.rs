//! Tracked file records produced by a catalog scan

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// What kind of configuration a tracked file holds.
///
/// The lowercase display name doubles as the category segment of every
/// remote key, so renaming a variant moves its files on the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Shell,
    Git,
    Editor,
    Cloud,
    /// Container tooling (docker and friends).
    Docker,
    /// Language package managers and toolchains.
    Language,
    /// AI assistant tool configuration such as `.claude/`.
    Assistant,
    Custom,
    /// Cheat sheets and notes kept alongside configs.
    Documentation,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Shell,
        Category::Git,
        Category::Editor,
        Category::Cloud,
        Category::Docker,
        Category::Language,
        Category::Assistant,
        Category::Custom,
        Category::Documentation,
        Category::Unknown,
    ];

    /// Display name, e.g. `Shell`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Shell => "Shell",
            Category::Git => "Git",
            Category::Editor => "Editor",
            Category::Cloud => "Cloud",
            Category::Docker => "Docker",
            Category::Language => "Language",
            Category::Assistant => "Assistant",
            Category::Custom => "Custom",
            Category::Documentation => "Documentation",
            Category::Unknown => "Unknown",
        }
    }

    /// Segment used in remote keys.
    ///
    /// Assistant configs live under `claude/`, the folder name other clients
    /// of the same bucket already use.
    pub fn key_segment(&self) -> String {
        match self {
            Category::Assistant => "claude".to_string(),
            other => other.as_str().to_lowercase(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.key_segment() == lowered || c.as_str().eq_ignore_ascii_case(&lowered))
            .or(match lowered.as_str() {
                "containers" => Some(Category::Docker),
                _ => None,
            })
            .ok_or_else(|| Error::InvalidCategory {
                value: s.to_string(),
            })
    }
}

/// Sync priority tier. Ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::Critical => 3,
            Priority::High => 2,
            Priority::Medium => 1,
            Priority::Low => 0,
        }
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// A configuration file found by a scan.
///
/// Records are immutable snapshots: a later change on disk is only seen
/// after the next scan builds a fresh record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub id: Uuid,
    /// Absolute location on disk.
    pub path: PathBuf,
    /// Location relative to the scan root, forward-slash separated.
    pub relative_path: String,
    pub filename: String,
    pub category: Category,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Lowercase hex SHA-256 of the content; empty for directories.
    pub checksum: String,
    /// False when an exclude pattern matched or the content looks like it
    /// carries credentials. Unsafe files never reach a backend.
    pub is_safe: bool,
    pub priority: Priority,
    pub is_directory: bool,
}

impl TrackedFile {
    /// Whether a transfer of this file may be attempted at all.
    pub fn is_transferable(&self) -> bool {
        self.is_safe && !self.is_directory
    }
}
