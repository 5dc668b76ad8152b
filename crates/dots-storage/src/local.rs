//! Local ubiquity-container store
//!
//! Files live in a directory that a platform daemon syncs in the background.
//! Every read, write, and delete holds a [`CoordinationGuard`] on the
//! container so the daemon and other writers never see a half-written file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use dots_fs::{CoordinationGuard, NormalizedPath, compute_bytes_checksum, compute_file_checksum, io};
use dots_meta::{ProviderConfig, ProviderKind, RemoteObject, TrackedFile};
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::keys::{config_prefix, ensure_transferable, remote_key};
use crate::{Error, Result};

const DEFAULT_MATERIALIZE_WAIT: Duration = Duration::from_secs(30);

pub struct LocalStoreBackend {
    container: Option<PathBuf>,
    root_folder: String,
    identity_token: Option<String>,
    materialize_wait: Duration,
}

/// Outcome of one coordinated read attempt.
enum ReadAttempt {
    Ready(Vec<u8>),
    /// Only the daemon's placeholder exists so far.
    Pending,
    Missing,
}

impl LocalStoreBackend {
    pub fn new(config: &ProviderConfig, identity_token: Option<String>) -> Self {
        Self {
            container: config.container.clone(),
            root_folder: config.root_folder.clone(),
            identity_token,
            materialize_wait: DEFAULT_MATERIALIZE_WAIT,
        }
    }

    /// Upper bound on waiting for the daemon to materialize a file.
    pub fn with_materialize_wait(mut self, wait: Duration) -> Self {
        self.materialize_wait = wait;
        self
    }

    fn container(&self) -> Result<PathBuf> {
        self.container.clone().ok_or_else(|| Error::NotConfigured {
            provider: ProviderKind::LocalStore,
            missing: "container directory".into(),
        })
    }

    /// Placeholder the daemon leaves while a file is still in the cloud.
    pub fn placeholder_path(path: &Path) -> Option<PathBuf> {
        let name = path.file_name()?.to_string_lossy();
        Some(path.with_file_name(format!(".{name}.icloud")))
    }

    fn is_artifact(name: &str) -> bool {
        name == CoordinationGuard::LOCK_FILE
            || name.ends_with(".icloud")
            || (name.starts_with('.') && name.ends_with(".tmp"))
            || name.starts_with(".dotsync-probe-")
    }

    fn read_attempt(container: &Path, key: &str) -> Result<ReadAttempt> {
        let _guard = CoordinationGuard::acquire(container)?;
        let path = container.join(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(ReadAttempt::Ready(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let pending = Self::placeholder_path(&path).is_some_and(|p| p.exists());
                Ok(if pending {
                    ReadAttempt::Pending
                } else {
                    ReadAttempt::Missing
                })
            }
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn describe(container: &Path, key: String) -> Result<Option<RemoteObject>> {
        let path = container.join(&key);
        let metadata = match fs::metadata(&path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };
        let modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::from)
            .map_err(|e| Error::io(&path, e))?;
        let checksum = compute_file_checksum(&path).map_err(|e| Error::io(&path, e))?;
        Ok(Some(RemoteObject {
            key,
            size: metadata.len(),
            modified,
            checksum: Some(checksum),
        }))
    }

    fn list_blocking(container: &Path, root_folder: &str) -> Result<Vec<RemoteObject>> {
        let _guard = CoordinationGuard::acquire(container)?;
        let prefix = config_prefix(root_folder);
        let configs_dir = container.join(&prefix);
        let categories = match fs::read_dir(&configs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(configs_dir, e)),
        };

        let mut objects = Vec::new();
        for category in categories {
            let category = category.map_err(|e| Error::io(&configs_dir, e))?;
            if !category.path().is_dir() {
                continue;
            }
            let category_name = category.file_name().to_string_lossy().into_owned();
            let entries = fs::read_dir(category.path()).map_err(|e| Error::io(category.path(), e))?;
            for entry in entries {
                let entry = entry.map_err(|e| Error::io(category.path(), e))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if Self::is_artifact(&name) {
                    continue;
                }
                let key = format!("{prefix}{category_name}/{name}");
                if let Some(object) = Self::describe(container, key)? {
                    objects.push(object);
                }
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

/// Run blocking filesystem work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::io("<blocking task>", std::io::Error::other(e)))?
}

#[async_trait]
impl StorageBackend for LocalStoreBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalStore
    }

    fn is_configured(&self) -> bool {
        self.container.is_some()
    }

    fn reports_checksums(&self) -> bool {
        true
    }

    fn root_folder(&self) -> &str {
        &self.root_folder
    }

    async fn upload(&self, file: &TrackedFile, bytes: &[u8]) -> Result<()> {
        ensure_transferable(file)?;
        let container = self.container()?;
        let key = remote_key(&self.root_folder, file);
        let target = NormalizedPath::new(container.join(&key));
        let bytes = bytes.to_vec();
        let len = bytes.len();
        let modified = SystemTime::from(file.modified);

        blocking(move || {
            let _guard = CoordinationGuard::acquire(&container)?;
            io::write_atomic(&target, &bytes)?;
            io::set_modified(&target, modified)?;
            Ok(())
        })
        .await?;
        tracing::info!(key = %key, bytes = len, "Wrote to local store");
        Ok(())
    }

    async fn download(&self, file: &TrackedFile) -> Result<Vec<u8>> {
        ensure_transferable(file)?;
        let container = self.container()?;
        let key = remote_key(&self.root_folder, file);

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_interval(Duration::from_secs(5))
            .with_max_elapsed_time(Some(self.materialize_wait))
            .build();

        backoff::future::retry(policy, || {
            let container = container.clone();
            let key = key.clone();
            async move {
                let attempt_key = key.clone();
                let attempt = blocking(move || {
                    Self::read_attempt(&container, &attempt_key)
                })
                .await
                .map_err(backoff::Error::permanent)?;
                match attempt {
                    ReadAttempt::Ready(bytes) => Ok(bytes),
                    ReadAttempt::Missing => Err(backoff::Error::permanent(Error::FileNotFound { key })),
                    ReadAttempt::Pending => {
                        tracing::debug!(key = %key, "Waiting for file to materialize");
                        Err(backoff::Error::transient(Error::DownloadFailed {
                            key,
                            message: "file has not been materialized by the sync daemon".into(),
                        }))
                    }
                }
            }
        })
        .await
    }

    async fn list_files(&self) -> Result<Vec<RemoteObject>> {
        let container = self.container()?;
        let root_folder = self.root_folder.clone();
        blocking(move || {
            Self::list_blocking(&container, &root_folder)
        })
        .await
    }

    async fn delete(&self, file: &TrackedFile) -> Result<()> {
        ensure_transferable(file)?;
        let container = self.container()?;
        let key = remote_key(&self.root_folder, file);
        blocking(move || {
            let _guard = CoordinationGuard::acquire(&container)?;
            let path = container.join(&key);
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::io(path, e)),
            }
        })
        .await
    }

    async fn get_metadata(&self, file: &TrackedFile) -> Result<Option<RemoteObject>> {
        ensure_transferable(file)?;
        let container = self.container()?;
        let key = remote_key(&self.root_folder, file);
        blocking(move || {
            let _guard = CoordinationGuard::acquire(&container)?;
            Self::describe(&container, key)
        })
        .await
    }

    async fn test_connection(&self) -> bool {
        if self.identity_token.as_deref().is_none_or(str::is_empty) {
            tracing::warn!("Local store connection test failed: no system identity token");
            return false;
        }
        let container = match self.container() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "Local store connection test failed");
                return false;
            }
        };
        let probe = container
            .join(config_prefix(&self.root_folder))
            .join(format!(".dotsync-probe-{}", Uuid::new_v4().simple()));
        let content = compute_bytes_checksum(probe.to_string_lossy().as_bytes());

        let result = blocking(move || {
            let _guard = CoordinationGuard::acquire(&container)?;
            io::write_atomic(&NormalizedPath::new(&probe), content.as_bytes())?;
            fs::remove_file(&probe).map_err(|e| Error::io(&probe, e))
        })
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Local store connection test failed");
                false
            }
        }
    }
}
