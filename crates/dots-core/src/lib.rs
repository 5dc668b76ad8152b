//! Core orchestration layer for dotsync
//!
//! This crate ties the lower layers together:
//!
//! - **SyncEngine**: lists the remote, classifies every tracked file, runs
//!   transfer batches, and resolves conflicts
//! - **ChangeWatcher**: debounces local edits and re-enters the engine
//! - **Collaborators**: secret store, notifier, profile filter, and state
//!   store interfaces the engine consumes
//! - **logging**: the process-wide tracing subscriber
//!
//! # Architecture
//!
//! ```text
//!                      dots-cli
//!                         |
//!                     dots-core
//!                         |
//!      +---------+--------+--------+-----------+
//!      |         |        |        |           |
//!   dots-fs  dots-meta dots-safety dots-catalog dots-storage
//! ```

pub mod collab;
pub mod error;
pub mod logging;
pub mod sync;
pub mod watcher;

pub use collab::{
    EnvSecretStore, JsonStateStore, LogNotifier, MemorySecretStore, MemoryStateStore, Notifier,
    ProfileFilter, RecordingNotifier, SecretStore, StateStore, active_profile,
    credentials_from_secrets, resolve_profile, select_profile,
};
pub use error::{Error, Result};
pub use sync::{
    EngineSnapshot, Fingerprint, ResolutionOutcome, SyncEngine, SyncOptions, SyncReport, classify,
};
pub use watcher::{ChangeHandler, ChangeWatcher, DEFAULT_DEBOUNCE, SyncOnChange, is_editor_artifact};
