//! Interfaces to the services around the engine
//!
//! The engine never talks to a keychain, a notification center, or a
//! settings file directly. It consumes these traits, and the binary picks
//! the implementations.

mod credentials;
mod notifier;
mod profile;
mod secrets;
mod state;

pub use credentials::{credentials_from_secrets, secret_names};
pub use notifier::{LogNotifier, Notifier, RecordingNotifier};
pub use profile::{ProfileFilter, active_profile, resolve_profile, select_profile};
pub use secrets::{EnvSecretStore, MemorySecretStore, SecretStore};
pub use state::{JsonStateStore, MemoryStateStore, StateStore, keys};
