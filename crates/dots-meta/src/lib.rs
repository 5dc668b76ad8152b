//! Data model and configuration for dotsync.
//!
//! This crate defines the records that flow between the catalog, the
//! storage backends, and the reconciliation engine, along with the
//! on-disk application configuration and sync profiles.

pub mod config;
pub mod error;
pub mod file;
pub mod operation;
pub mod profile;
pub mod remote;
pub mod status;

pub use config::{AppConfig, ProviderConfig, ProviderKind, WatcherSettings};
pub use error::{Error, Result};
pub use file::{Category, Priority, TrackedFile};
pub use operation::{ConflictResolution, Direction, Operation, OperationStatus};
pub use profile::SyncProfile;
pub use remote::RemoteObject;
pub use status::{SyncState, SyncStatus};
