//! Shared fixtures for dots-core integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dots_fs::compute_bytes_checksum;
use dots_meta::{ProviderKind, RemoteObject, TrackedFile};
use dots_storage::{Error, Result, StorageBackend, ensure_transferable, remote_key};
use tempfile::TempDir;

pub const ROOT_FOLDER: &str = "dot-sync";

struct StoredObject {
    bytes: Vec<u8>,
    modified: DateTime<Utc>,
    checksum: Option<String>,
}

/// In-memory backend that records the uploaded file's modification time,
/// the way the real backends carry it across as metadata.
pub struct FakeBackend {
    reports_checksums: bool,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing: Mutex<HashSet<String>>,
    uploads: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    reject_credentials: AtomicBool,
    hang: AtomicBool,
}

impl FakeBackend {
    pub fn new(reports_checksums: bool) -> Self {
        Self {
            reports_checksums,
            objects: Mutex::new(BTreeMap::new()),
            failing: Mutex::new(HashSet::new()),
            uploads: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            reject_credentials: AtomicBool::new(false),
            hang: AtomicBool::new(false),
        }
    }

    pub fn put(&self, key: &str, bytes: &[u8], modified: DateTime<Utc>, checksum: Option<&str>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                modified,
                checksum: checksum.map(str::to_string),
            },
        );
    }

    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|o| o.bytes.clone())
    }

    pub fn fail_uploads_of(&self, filename: &str) {
        self.failing.lock().unwrap().insert(filename.to_string());
    }

    /// Fail every upload as if the stored credentials had been revoked.
    pub fn reject_credentials(&self) {
        self.reject_credentials.store(true, Ordering::SeqCst);
    }

    /// Upload calls made, successful or not.
    pub fn upload_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Make listing hang far longer than any call timeout.
    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageBackend for FakeBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::S3Compatible
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn reports_checksums(&self) -> bool {
        self.reports_checksums
    }

    fn root_folder(&self) -> &str {
        ROOT_FOLDER
    }

    async fn upload(&self, file: &TrackedFile, bytes: &[u8]) -> Result<()> {
        ensure_transferable(file)?;
        let key = remote_key(ROOT_FOLDER, file);
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_credentials.load(Ordering::SeqCst) {
            return Err(Error::AuthenticationFailed {
                message: "403 Forbidden".into(),
            });
        }
        if self.failing.lock().unwrap().contains(&file.filename) {
            return Err(Error::UploadFailed {
                key,
                message: "injected failure".into(),
            });
        }
        let checksum = self.reports_checksums.then(|| compute_bytes_checksum(bytes));
        self.put(&key, bytes, file.modified, checksum.as_deref());
        self.uploads.lock().unwrap().push(key);
        Ok(())
    }

    async fn download(&self, file: &TrackedFile) -> Result<Vec<u8>> {
        ensure_transferable(file)?;
        let key = remote_key(ROOT_FOLDER, file);
        self.bytes(&key).ok_or(Error::FileNotFound { key })
    }

    async fn list_files(&self) -> Result<Vec<RemoteObject>> {
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, o)| RemoteObject {
                key: key.clone(),
                size: o.bytes.len() as u64,
                modified: o.modified,
                checksum: if self.reports_checksums { o.checksum.clone() } else { None },
            })
            .collect())
    }

    async fn delete(&self, file: &TrackedFile) -> Result<()> {
        ensure_transferable(file)?;
        self.objects.lock().unwrap().remove(&remote_key(ROOT_FOLDER, file));
        Ok(())
    }

    async fn get_metadata(&self, file: &TrackedFile) -> Result<Option<RemoteObject>> {
        ensure_transferable(file)?;
        let key = remote_key(ROOT_FOLDER, file);
        Ok(self.list_files().await?.into_iter().find(|o| o.key == key))
    }

    async fn test_connection(&self) -> bool {
        true
    }
}

/// A temporary home directory containing the given files.
pub fn home_with(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (relative, content) in files {
        write(dir.path(), relative, content);
    }
    dir
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
