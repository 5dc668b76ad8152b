//! Atomic and coordinated I/O operations

use crate::{Error, NormalizedPath, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Suffix appended to a file's path when it is backed up before overwrite.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock to prevent concurrent access.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Temp file lives in the same directory so the rename stays on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| temp_file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    FileExt::unlock(&temp_file).map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))?;

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Stamp a file's modification time.
///
/// Transfers carry the source file's mtime across so both sides compare equal
/// once content has been copied.
pub fn set_modified(path: &NormalizedPath, modified: SystemTime) -> Result<()> {
    let native_path = path.to_native();
    OpenOptions::new()
        .write(true)
        .open(&native_path)
        .and_then(|file| file.set_modified(modified))
        .map_err(|e| Error::io(&native_path, e))
}

/// Copy an existing file to `<path>.backup`, replacing any older backup.
///
/// Returns the backup location, or `None` when there was nothing to back up.
pub fn backup_copy(path: &NormalizedPath) -> Result<Option<PathBuf>> {
    let native_path = path.to_native();
    if !native_path.is_file() {
        return Ok(None);
    }

    let backup_path = PathBuf::from(format!("{}{}", path.as_str(), BACKUP_SUFFIX));
    fs::copy(&native_path, &backup_path).map_err(|e| Error::io(&backup_path, e))?;
    tracing::debug!(path = %path, backup = %backup_path.display(), "Backed up file");
    Ok(Some(backup_path))
}

/// Scoped exclusive access to a directory shared with another writer.
///
/// Holding a guard serializes all reads, writes, and deletes performed
/// through it against every other guard on the same directory, in this
/// process or any other. The lock is released when the guard is dropped,
/// including on early returns and panics.
#[derive(Debug)]
pub struct CoordinationGuard {
    file: File,
    lock_path: PathBuf,
}

impl CoordinationGuard {
    /// Name of the lock file created inside the coordinated directory.
    pub const LOCK_FILE: &'static str = ".coordination.lock";

    /// Block until exclusive access to `dir` is acquired.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let (file, lock_path) = Self::open_lock_file(dir)?;
        file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: lock_path.clone(),
        })?;
        Ok(Self { file, lock_path })
    }

    /// Acquire exclusive access only if no other holder exists right now.
    pub fn try_acquire(dir: &Path) -> Result<Option<Self>> {
        let (file, lock_path) = Self::open_lock_file(dir)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, lock_path })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(_) => Err(Error::LockFailed { path: lock_path }),
        }
    }

    /// Path of the lock file backing this guard.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    fn open_lock_file(dir: &Path) -> Result<(File, PathBuf)> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        let lock_path = dir.join(Self::LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| Error::io(&lock_path, e))?;
        Ok((file, lock_path))
    }
}

impl Drop for CoordinationGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.lock_path.display(), error = %e, "Failed to release coordination lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_copy_missing_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join(".vimrc"));
        assert!(backup_copy(&path).unwrap().is_none());
    }

    #[test]
    fn backup_copy_preserves_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(".vimrc");
        fs::write(&file, "set number").unwrap();

        let backup = backup_copy(&NormalizedPath::new(&file)).unwrap().unwrap();

        assert_eq!(backup, dir.path().join(".vimrc.backup"));
        assert_eq!(fs::read_to_string(backup).unwrap(), "set number");
    }

    #[test]
    fn set_modified_survives_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join(".zshrc"));
        let stamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);

        write_atomic(&path, b"export EDITOR=vim").unwrap();
        set_modified(&path, stamp).unwrap();

        let modified = fs::metadata(path.to_native()).unwrap().modified().unwrap();
        assert_eq!(modified, stamp);
    }

    #[test]
    fn set_modified_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("absent"));
        assert!(set_modified(&path, SystemTime::now()).is_err());
    }

    #[test]
    fn guard_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();

        let first = CoordinationGuard::acquire(dir.path()).unwrap();
        assert!(CoordinationGuard::try_acquire(dir.path()).unwrap().is_none());

        drop(first);
        assert!(CoordinationGuard::try_acquire(dir.path()).unwrap().is_some());
    }
}
