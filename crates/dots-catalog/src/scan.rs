//! Directory scanning and fingerprinting

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dots_fs::{NormalizedPath, compute_file_checksum};
use dots_meta::{Category, Priority, TrackedFile};
use dots_safety::SafetyGate;
use uuid::Uuid;

use crate::patterns::{PatternTable, default_excludes};
use crate::priority::priority_for;
use crate::{Error, Result};

/// Location of application preference files, relative to the scan root.
pub const PREFERENCES_DIR: &str = "Library/Preferences";

/// Builds tracked-file records for a scan root.
#[derive(Debug, Clone)]
pub struct Catalog {
    files: PatternTable,
    preferences: PatternTable,
    excludes: Vec<String>,
    gate: SafetyGate,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            files: PatternTable::default_files(),
            preferences: PatternTable::default_preferences(),
            excludes: default_excludes(),
            gate: SafetyGate::new(),
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(mut self, files: PatternTable) -> Self {
        self.files = files;
        self
    }

    pub fn with_preferences(mut self, preferences: PatternTable) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Scan `root` for every configured pattern that exists.
    ///
    /// Results are sorted by priority (critical first), then category name,
    /// then relative path.
    pub fn scan(&self, root: &Path) -> Result<Vec<TrackedFile>> {
        let root = dunce::canonicalize(root).map_err(|_| Error::RootNotFound {
            path: root.to_path_buf(),
        })?;
        let root_norm = NormalizedPath::new(&root);
        let prefs_dir = root.join(PREFERENCES_DIR);

        let candidates = self
            .files
            .iter()
            .map(|entry| (root.join(entry.relative()), entry.category))
            .chain(
                self.preferences
                    .iter()
                    .map(|entry| (prefs_dir.join(entry.relative()), entry.category)),
            );

        let mut found = Vec::new();
        for (path, category) in candidates {
            if fs::symlink_metadata(&path).is_err() {
                continue;
            }
            match self.fingerprint(&root_norm, &path, category, Uuid::new_v4()) {
                Ok(file) => found.push(file),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry"),
            }
        }

        sort_files(&mut found);
        tracing::info!(root = %root_norm, count = found.len(), "Scan complete");
        Ok(found)
    }

    /// Re-read a previously tracked file, keeping its identity.
    ///
    /// Returns `None` when the file no longer exists.
    pub fn refresh(&self, root: &Path, file: &TrackedFile) -> Result<Option<TrackedFile>> {
        if !file.path.exists() {
            return Ok(None);
        }
        let root = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let root_norm = NormalizedPath::new(&root);
        self.fingerprint(&root_norm, &file.path, file.category, file.id)
            .map(Some)
    }

    /// Whether a name or root-relative path hits an exclude pattern.
    pub fn is_excluded(&self, filename: &str, relative_path: &str) -> bool {
        self.excludes
            .iter()
            .any(|p| filename.contains(p.as_str()) || relative_path.contains(p.as_str()))
    }

    pub fn files_in_category(files: &[TrackedFile], category: Category) -> Vec<&TrackedFile> {
        files.iter().filter(|f| f.category == category).collect()
    }

    pub fn files_with_priority(files: &[TrackedFile], priority: Priority) -> Vec<&TrackedFile> {
        files.iter().filter(|f| f.priority == priority).collect()
    }

    fn fingerprint(
        &self,
        root: &NormalizedPath,
        path: &Path,
        category: Category,
        id: Uuid,
    ) -> Result<TrackedFile> {
        let metadata = fs::metadata(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let is_directory = metadata.is_dir();
        let modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::from)
            .map_err(|e| Error::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        let checksum = if is_directory {
            String::new()
        } else {
            compute_file_checksum(path).map_err(|e| Error::Io {
                path: path.to_path_buf(),
                source: e,
            })?
        };

        let normalized = NormalizedPath::new(path);
        let relative_path = normalized
            .relative_to(root)
            .unwrap_or_else(|| normalized.as_str().to_string());
        let filename = normalized.file_name().unwrap_or_default().to_string();

        let is_safe = if self.is_excluded(&filename, &relative_path) {
            tracing::debug!(file = %relative_path, "Excluded by name pattern");
            false
        } else {
            !self.gate.contains_secret(path)
        };

        Ok(TrackedFile {
            id,
            path: PathBuf::from(path),
            priority: priority_for(&filename, category),
            relative_path,
            filename,
            category,
            size: metadata.len(),
            modified,
            checksum,
            is_safe,
            is_directory,
        })
    }
}

fn sort_files(files: &mut [TrackedFile]) {
    files.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
            .then_with(|| a.relative_path.cmp(&b.relative_path))
    });
}
