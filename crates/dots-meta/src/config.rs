//! Application configuration
//!
//! Loaded from `~/.config/dotsync/config.toml` by default. Credentials are
//! never kept here; backends fetch them by name from the secret store.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use dots_fs::{ConfigStore, NormalizedPath};

/// Which storage backend family to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Amazon S3.
    #[default]
    S3,
    /// Any service speaking the S3 API at a custom endpoint.
    S3Compatible,
    /// Azure Blob Storage.
    Azure,
    /// Google Cloud Storage.
    Gcs,
    /// A locally synced container directory managed by a background daemon.
    LocalStore,
}

impl ProviderKind {
    /// Whether this provider speaks the signed S3 REST protocol.
    pub fn is_s3_family(&self) -> bool {
        matches!(self, ProviderKind::S3 | ProviderKind::S3Compatible)
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" | "aws" | "aws-s3" => Ok(ProviderKind::S3),
            "s3-compatible" | "minio" => Ok(ProviderKind::S3Compatible),
            "azure" | "azure-blob" => Ok(ProviderKind::Azure),
            "gcs" | "gcp" | "google-cloud" => Ok(ProviderKind::Gcs),
            "local-store" | "local" | "icloud" => Ok(ProviderKind::LocalStore),
            _ => Err(Error::InvalidProvider {
                kind: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::S3 => write!(f, "s3"),
            ProviderKind::S3Compatible => write!(f, "s3-compatible"),
            ProviderKind::Azure => write!(f, "azure"),
            ProviderKind::Gcs => write!(f, "gcs"),
            ProviderKind::LocalStore => write!(f, "local-store"),
        }
    }
}

/// Non-secret settings for the active backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Bucket (S3, GCS) or container (Azure) name.
    #[serde(default)]
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Service endpoint override, required for S3-compatible services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Prefix under which every key is stored.
    #[serde(default = "default_root_folder")]
    pub root_folder: String,
    /// Azure storage account name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Container directory for the local store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<PathBuf>,
}

fn default_root_folder() -> String {
    "dot-sync".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            bucket: String::new(),
            region: None,
            endpoint: None,
            root_folder: default_root_folder(),
            account: None,
            container: None,
        }
    }
}

impl ProviderConfig {
    /// Region, falling back to `us-east-1`.
    pub fn region_or_default(&self) -> &str {
        self.region.as_deref().unwrap_or("us-east-1")
    }
}

/// Change watcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherSettings {
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
    /// Upload a changed file as soon as its debounce window closes.
    #[serde(default)]
    pub auto_sync: bool,
}

fn default_debounce_secs() -> u64 {
    5
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            debounce_secs: default_debounce_secs(),
            auto_sync: false,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory scanned for config files. Defaults to the home directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
    #[serde(default)]
    pub watcher: WatcherSettings,
    /// Upper bound on any single backend call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_profile")]
    pub active_profile: String,
    /// Where last-sync and similar state is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_profile() -> String {
    "Full".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan_root: None,
            provider: None,
            watcher: WatcherSettings::default(),
            call_timeout_secs: default_call_timeout_secs(),
            active_profile: default_profile(),
            state_file: None,
        }
    }
}

impl AppConfig {
    /// Default config location, `<config dir>/dotsync/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("dotsync").join("config.toml"))
            .ok_or(Error::HomeNotFound)
    }

    /// Load from `path`, or defaults when the file does not exist.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let config: Self = ConfigStore::new().load_or_default(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        ConfigStore::new().save(path, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.call_timeout_secs == 0 {
            return Err(Error::InvalidConfig {
                message: "call_timeout_secs must be greater than zero".into(),
            });
        }
        if let Some(provider) = &self.provider {
            match provider.kind {
                ProviderKind::S3Compatible if provider.endpoint.is_none() => {
                    return Err(Error::InvalidConfig {
                        message: "s3-compatible provider requires an endpoint".into(),
                    });
                }
                ProviderKind::LocalStore if provider.container.is_none() => {
                    return Err(Error::InvalidConfig {
                        message: "local-store provider requires a container directory".into(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Scan root, falling back to the home directory.
    pub fn scan_root(&self) -> Result<PathBuf> {
        match &self.scan_root {
            Some(root) => Ok(root.clone()),
            None => dirs::home_dir().ok_or(Error::HomeNotFound),
        }
    }

    /// State file, falling back to `<data dir>/dotsync/state.json`.
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join("dotsync").join("state.json"))
                .ok_or(Error::HomeNotFound),
        }
    }
}
