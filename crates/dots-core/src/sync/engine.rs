//! SyncEngine implementation
//!
//! The engine owns the tracked file set and the status table. Every pass
//! (reconcile or transfer batch) runs under one async mutex, so there is a
//! single writer, and the [`EngineSnapshot`] is published through a watch
//! channel only when a pass starts or finishes.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use dots_catalog::Catalog;
use dots_fs::{NormalizedPath, io};
use dots_meta::{
    AppConfig, ConflictResolution, Direction, Operation, RemoteObject, SyncState, SyncStatus,
    TrackedFile,
};
use dots_safety::SafetyGate;
use dots_storage::{StorageBackend, create_backend, remote_key};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;

use super::classify::{Fingerprint, classify};
use super::report::{EngineSnapshot, ResolutionOutcome, SyncOptions, SyncReport};
use crate::collab::{
    JsonStateStore, LogNotifier, Notifier, SecretStore, StateStore, credentials_from_secrets, keys,
};
use crate::{Error, Result};

type StorageError = dots_storage::Error;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// State only the pass holding the lock may touch.
#[derive(Default)]
struct EngineState {
    files: Vec<TrackedFile>,
    statuses: Vec<SyncStatus>,
    remote_only: Vec<RemoteObject>,
    last_sync: Option<DateTime<Utc>>,
    conflict_count: usize,
}

/// Reconciliation engine over one storage backend.
pub struct SyncEngine {
    backend: Arc<dyn StorageBackend>,
    catalog: Catalog,
    gate: SafetyGate,
    root: PathBuf,
    call_timeout: Duration,
    cancel: CancellationToken,
    notifier: Arc<dyn Notifier>,
    state_store: Option<Arc<dyn StateStore>>,
    state: Mutex<EngineState>,
    snapshot: watch::Sender<EngineSnapshot>,
    checksum_warning_logged: AtomicBool,
}

impl SyncEngine {
    /// Create an engine for files under `root`.
    pub fn new(backend: Arc<dyn StorageBackend>, root: impl Into<PathBuf>) -> Self {
        let (snapshot, _) = watch::channel(EngineSnapshot {
            checksum_comparison: backend.reports_checksums(),
            ..EngineSnapshot::default()
        });
        Self {
            backend,
            catalog: Catalog::new(),
            gate: SafetyGate,
            root: root.into(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            cancel: CancellationToken::new(),
            notifier: Arc::new(LogNotifier),
            state_store: None,
            state: Mutex::new(EngineState::default()),
            snapshot,
            checksum_warning_logged: AtomicBool::new(false),
        }
    }

    /// Build the engine described by a loaded [`AppConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBackend`] when the config has no provider section.
    pub fn from_config(config: &AppConfig, secrets: &dyn SecretStore) -> Result<Self> {
        let provider = config.provider.as_ref().ok_or(Error::NoBackend)?;
        let timeout = Duration::from_secs(config.call_timeout_secs);
        let credentials = credentials_from_secrets(provider.kind, secrets);
        let backend: Arc<dyn StorageBackend> = Arc::from(create_backend(provider, credentials, timeout)?);

        let state_store = JsonStateStore::new(config.state_path()?);
        Ok(Self::new(backend, config.scan_root()?)
            .with_call_timeout(timeout)
            .with_state_store(Arc::new(state_store)))
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Upper bound on any single backend call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Attach persisted state and restore the last sync time from it.
    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        let last_sync = match store.get(keys::LAST_SYNC) {
            Ok(Some(value)) => serde_json::from_value::<DateTime<Utc>>(value).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read persisted sync state");
                None
            }
        };
        self.state.get_mut().last_sync = last_sync;
        self.snapshot.send_modify(|s| s.last_sync = last_sync);
        self.state_store = Some(store);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified at every pass boundary.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot.subscribe()
    }

    /// Files currently in `conflict`.
    pub fn conflicts(&self) -> Vec<SyncStatus> {
        self.snapshot.borrow().conflicts()
    }

    /// Scan the root with the engine's catalog.
    ///
    /// The result is not tracked until passed to [`track`](Self::track),
    /// usually after a profile filter.
    pub fn scan(&self) -> Result<Vec<TrackedFile>> {
        Ok(self.catalog.scan(&self.root)?)
    }

    /// Replace the tracked file set.
    ///
    /// Unsafe files and directories are dropped here and never reach a
    /// backend call.
    pub async fn track(&self, files: Vec<TrackedFile>) {
        let (files, dropped): (Vec<_>, Vec<_>) = files.into_iter().partition(TrackedFile::is_transferable);
        for file in &dropped {
            tracing::debug!(file = %file.relative_path, safe = file.is_safe, "Not tracking file");
        }

        let mut owners: HashMap<String, &str> = HashMap::new();
        for file in &files {
            let key = remote_key(self.backend.root_folder(), file);
            if let Some(previous) = owners.insert(key.clone(), &file.relative_path) {
                tracing::warn!(
                    key = %key,
                    first = %previous,
                    second = %file.relative_path,
                    "Tracked files share a remote key; transfers overwrite each other"
                );
            }
        }

        tracing::info!(tracked = files.len(), skipped = dropped.len(), "Tracking files");
        let mut state = self.state.lock().await;
        state.files = files;
    }

    pub async fn tracked_files(&self) -> Vec<TrackedFile> {
        self.state.lock().await.files.clone()
    }

    /// Find a tracked file by relative path, absolute path, or unique filename.
    pub async fn find(&self, query: &str) -> Result<TrackedFile> {
        let state = self.state.lock().await;
        let as_path = Path::new(query);
        let absolute = if as_path.is_absolute() {
            as_path.to_path_buf()
        } else {
            self.root.join(as_path)
        };

        if let Some(file) = state
            .files
            .iter()
            .find(|f| f.relative_path == query || f.path == absolute)
        {
            return Ok(file.clone());
        }

        let mut by_name = state.files.iter().filter(|f| f.filename == query);
        match (by_name.next(), by_name.next()) {
            (Some(file), None) => Ok(file.clone()),
            _ => Err(Error::NotTracked { path: absolute }),
        }
    }

    /// List the remote and classify every tracked file.
    pub async fn reconcile(&self) -> Result<Vec<SyncStatus>> {
        let mut state = self.state.lock().await;
        self.reconcile_locked(&mut state).await?;
        Ok(state.statuses.clone())
    }

    /// Upload every file whose state calls for it.
    pub async fn push(&self, options: SyncOptions) -> Result<SyncReport> {
        let mut state = self.state.lock().await;
        let files = Self::files_wanting(&state, SyncState::wants_upload);
        self.transfer_locked(&mut state, &files, Direction::Upload, options)
            .await
    }

    /// Download every file whose state calls for it.
    pub async fn pull(&self, options: SyncOptions) -> Result<SyncReport> {
        let mut state = self.state.lock().await;
        let files = Self::files_wanting(&state, SyncState::wants_download);
        self.transfer_locked(&mut state, &files, Direction::Download, options)
            .await
    }

    /// Upload exactly these files, whatever their state.
    pub async fn upload_files(&self, files: &[TrackedFile], options: SyncOptions) -> Result<SyncReport> {
        let mut state = self.state.lock().await;
        self.transfer_locked(&mut state, files, Direction::Upload, options)
            .await
    }

    /// Download exactly these files, whatever their state.
    pub async fn download_files(&self, files: &[TrackedFile], options: SyncOptions) -> Result<SyncReport> {
        let mut state = self.state.lock().await;
        self.transfer_locked(&mut state, files, Direction::Download, options)
            .await
    }

    /// Settle a conflict the way the user chose.
    ///
    /// Conflicts are never resolved automatically; this is the only path
    /// that moves a conflicted file.
    pub async fn resolve_conflict(
        &self,
        file: &TrackedFile,
        resolution: ConflictResolution,
    ) -> Result<ResolutionOutcome> {
        tracing::info!(file = %file.relative_path, resolution = %resolution, "Resolving conflict");
        match resolution {
            ConflictResolution::UseLocal => {
                let report = self
                    .upload_files(std::slice::from_ref(file), SyncOptions::default())
                    .await?;
                Ok(ResolutionOutcome::Transferred(report))
            }
            ConflictResolution::UseRemote => {
                let report = self
                    .download_files(std::slice::from_ref(file), SyncOptions::default())
                    .await?;
                Ok(ResolutionOutcome::Transferred(report))
            }
            ConflictResolution::Skip => Ok(ResolutionOutcome::Skipped),
            ConflictResolution::Merge => Ok(ResolutionOutcome::MergeRequested {
                local: file.path.clone(),
                remote_key: remote_key(self.backend.root_folder(), file),
            }),
        }
    }

    /// Cancel in-flight and future backend calls.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down sync engine");
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn files_wanting(state: &EngineState, wants: fn(&SyncState) -> bool) -> Vec<TrackedFile> {
        state
            .statuses
            .iter()
            .filter(|s| wants(&s.state))
            .map(|s| s.file.clone())
            .collect()
    }

    /// Run one backend call under the per-call timeout and the shutdown token.
    async fn call<T>(
        &self,
        operation: &str,
        call: impl Future<Output = dots_storage::Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StorageError::Cancelled.into()),
            outcome = tokio::time::timeout(self.call_timeout, call) => match outcome {
                Ok(result) => Ok(result?),
                Err(_) => Err(StorageError::Timeout {
                    operation: operation.to_string(),
                    seconds: self.call_timeout.as_secs(),
                }
                .into()),
            },
        }
    }

    async fn reconcile_locked(&self, state: &mut EngineState) -> Result<()> {
        let remote = self.call("list", self.backend.list_files()).await?;
        let root_folder = self.backend.root_folder();
        let by_key: HashMap<&str, &RemoteObject> = remote.iter().map(|o| (o.key.as_str(), o)).collect();

        let mut tracked_keys = HashSet::new();
        let mut statuses = Vec::with_capacity(state.files.len());
        for file in state.files.iter_mut() {
            let key = remote_key(root_folder, file);
            let remote_object = by_key.get(key.as_str()).copied();
            tracked_keys.insert(key);

            let local = match self.catalog.refresh(&self.root, file) {
                Ok(local) => local,
                Err(e) => {
                    tracing::warn!(file = %file.relative_path, error = %e, "Could not fingerprint file");
                    statuses.push(SyncStatus::failed(file.clone(), e.to_string()));
                    continue;
                }
            };
            if let Some(refreshed) = &local {
                *file = refreshed.clone();
            }

            let sync_state = classify(
                local.as_ref().map(Fingerprint::local),
                remote_object.map(Fingerprint::remote),
            );
            statuses.push(SyncStatus {
                file: file.clone(),
                local_modified: local.as_ref().map(|f| f.modified),
                remote_modified: remote_object.map(|o| o.modified),
                state: sync_state,
                error: (sync_state == SyncState::Error)
                    .then(|| "missing locally and on the remote".to_string()),
            });
        }

        let remote_only: Vec<RemoteObject> = remote
            .iter()
            .filter(|o| !tracked_keys.contains(&o.key))
            .cloned()
            .collect();

        let checksum_comparison = self.backend.reports_checksums();
        if !checksum_comparison && !self.checksum_warning_logged.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                provider = %self.backend.kind(),
                "Backend does not report checksums; conflicts are detected from timestamps only"
            );
        }

        let conflicts = statuses
            .iter()
            .filter(|s| s.state == SyncState::Conflict)
            .count();
        if conflicts > state.conflict_count {
            self.notifier.notify_conflicts_detected(conflicts);
        }
        state.conflict_count = conflicts;

        tracing::info!(
            tracked = statuses.len(),
            conflicts,
            remote_only = remote_only.len(),
            "Reconciled"
        );
        state.statuses = statuses;
        state.remote_only = remote_only;
        self.publish(state, false);
        Ok(())
    }

    async fn transfer_locked(
        &self,
        state: &mut EngineState,
        files: &[TrackedFile],
        direction: Direction,
        options: SyncOptions,
    ) -> Result<SyncReport> {
        self.publish(state, true);
        let mut report = SyncReport::default();
        let mut fatal = false;

        for (index, file) in files.iter().enumerate() {
            if !file.is_transferable() {
                tracing::warn!(file = %file.relative_path, "Refusing to transfer unsafe file or directory");
                report
                    .errors
                    .push(format!("{}: not transferable (unsafe or directory)", file.relative_path));
                continue;
            }

            let mut operation = Operation::new(file.clone(), direction);
            if options.dry_run {
                operation.skip();
                report
                    .actions
                    .push(format!("[dry-run] Would {direction} {}", file.relative_path));
                report.operations.push(operation);
                continue;
            }

            operation.start();
            let outcome = if self.cancel.is_cancelled() {
                Err(StorageError::Cancelled.into())
            } else {
                match direction {
                    Direction::Upload => self.upload_one(file).await,
                    Direction::Download => self.download_one(file).await,
                    Direction::Skip => Ok(()),
                }
            };

            match outcome {
                Ok(()) => {
                    operation.complete();
                    let verb = match direction {
                        Direction::Upload => "Uploaded",
                        Direction::Download => "Downloaded",
                        Direction::Skip => "Skipped",
                    };
                    report.actions.push(format!("{verb} {}", file.relative_path));
                }
                Err(e) => {
                    tracing::warn!(file = %file.relative_path, direction = %direction, error = %e, "Transfer failed");
                    report.errors.push(format!("{}: {e}", file.relative_path));
                    operation.fail(e.to_string());
                    if e.is_fatal() {
                        report.operations.push(operation);
                        fatal = true;
                        Self::abandon_rest(&mut report, &files[index + 1..], direction, &e);
                        break;
                    }
                }
            }
            report.operations.push(operation);
        }

        let transferred = report.completed();
        if !options.dry_run && transferred > 0 && report.errors.is_empty() {
            self.record_last_sync(state);
        }

        if !options.dry_run && !fatal && !self.cancel.is_cancelled() {
            if let Err(e) = self.reconcile_locked(state).await {
                tracing::warn!(error = %e, "Reclassification after batch failed");
                report.errors.push(format!("reclassification failed: {e}"));
            }
        }

        report.success = report.errors.is_empty();
        self.publish(state, false);

        if !options.dry_run {
            if report.success && transferred > 0 {
                self.notifier.notify_sync_completed(transferred);
            } else if !report.success {
                self.notifier
                    .notify_sync_failed(&format!("{} of {} file(s) failed", report.errors.len(), files.len()));
            }
        }
        Ok(report)
    }

    /// Record files never attempted because an earlier one hit a fatal error.
    fn abandon_rest(report: &mut SyncReport, rest: &[TrackedFile], direction: Direction, cause: &Error) {
        if rest.is_empty() {
            return;
        }
        tracing::error!(remaining = rest.len(), error = %cause, "Stopping batch");
        for file in rest {
            let mut operation = Operation::new(file.clone(), direction);
            operation.fail(format!("not attempted: {cause}"));
            report
                .errors
                .push(format!("{}: not attempted after earlier failure", file.relative_path));
            report.operations.push(operation);
        }
    }

    async fn upload_one(&self, file: &TrackedFile) -> Result<()> {
        // Content may have changed since the scan
        if self.gate.contains_secret(&file.path) {
            return Err(StorageError::ContainsCredentials {
                path: file.path.clone(),
            }
            .into());
        }
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| StorageError::io(&file.path, e))?;
        let modified = tokio::fs::metadata(&file.path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| StorageError::io(&file.path, e))?;
        let current = TrackedFile {
            modified: DateTime::<Utc>::from(modified),
            size: bytes.len() as u64,
            ..file.clone()
        };
        self.call("upload", self.backend.upload(&current, &bytes)).await
    }

    async fn download_one(&self, file: &TrackedFile) -> Result<()> {
        let bytes = self.call("download", self.backend.download(file)).await?;
        let target = NormalizedPath::new(&file.path);
        if let Some(backup) = io::backup_copy(&target)? {
            tracing::debug!(file = %file.relative_path, backup = %backup.display(), "Kept previous copy");
        }
        io::write_atomic(&target, &bytes)?;

        // Matching mtimes are what lets the next pass classify the pair as synced
        if let Some(remote) = self.call("metadata", self.backend.get_metadata(file)).await? {
            io::set_modified(&target, SystemTime::from(remote.modified))?;
        }
        Ok(())
    }

    fn record_last_sync(&self, state: &mut EngineState) {
        let now = Utc::now();
        state.last_sync = Some(now);
        if let Some(store) = &self.state_store {
            let persisted = serde_json::to_value(now)
                .map_err(|e| Error::State {
                    message: e.to_string(),
                })
                .and_then(|value| store.set(keys::LAST_SYNC, value));
            if let Err(e) = persisted {
                tracing::warn!(error = %e, "Could not persist last sync time");
            }
        }
    }

    fn publish(&self, state: &EngineState, is_syncing: bool) {
        let snapshot = EngineSnapshot {
            statuses: state.statuses.clone(),
            is_syncing,
            last_sync: state.last_sync,
            remote_only: state.remote_only.clone(),
            checksum_comparison: self.backend.reports_checksums(),
        };
        self.snapshot.send_replace(snapshot);
    }
}
