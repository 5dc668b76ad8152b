//! Configuration and engine setup shared by the commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dots_catalog::Catalog;
use dots_core::{EnvSecretStore, JsonStateStore, LogNotifier, ProfileFilter, SyncEngine, active_profile};
use dots_fs::NormalizedPath;
use dots_meta::{AppConfig, SyncProfile, TrackedFile};

use crate::error::Result;

/// Loaded configuration plus where it came from.
pub struct Context {
    pub config: AppConfig,
    pub config_path: PathBuf,
}

impl Context {
    /// Load the config from `path`, or from the default location.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => AppConfig::default_path()?,
        };
        let config = AppConfig::load(&NormalizedPath::new(&config_path))?;
        tracing::debug!(path = %config_path.display(), "Loaded configuration");
        Ok(Self { config, config_path })
    }

    /// Persisted state shared with the engine.
    pub fn state_store(&self) -> Result<JsonStateStore> {
        Ok(JsonStateStore::new(self.config.state_path()?))
    }

    /// The profile picked with `profiles --use`, else the configured one.
    pub fn profile(&self) -> Result<SyncProfile> {
        Ok(active_profile(&self.state_store()?, &self.config.active_profile)?)
    }

    pub fn scan_root(&self) -> Result<PathBuf> {
        Ok(self.config.scan_root()?)
    }

    /// Scan the root and keep the files the active profile syncs.
    pub fn profiled_scan(&self) -> Result<Vec<TrackedFile>> {
        let files = Catalog::new().scan(&self.scan_root()?)?;
        Ok(self.profile()?.filter(files))
    }

    /// Build the engine for the configured backend and track the profiled scan.
    pub async fn engine(&self) -> Result<Arc<SyncEngine>> {
        let engine = SyncEngine::from_config(&self.config, &EnvSecretStore::new())?
            .with_notifier(Arc::new(LogNotifier));
        let files = self.profile()?.filter(engine.scan()?);
        engine.track(files).await;
        Ok(Arc::new(engine))
    }
}
