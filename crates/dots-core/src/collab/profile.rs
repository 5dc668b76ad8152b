use dots_meta::{SyncProfile, TrackedFile};
use serde_json::Value;

use super::state::{StateStore, keys};
use crate::{Error, Result};

/// Narrows a scan result to the files a profile syncs.
///
/// Applied before files reach the engine.
pub trait ProfileFilter {
    fn filter(&self, files: Vec<TrackedFile>) -> Vec<TrackedFile>;
}

impl ProfileFilter for SyncProfile {
    fn filter(&self, files: Vec<TrackedFile>) -> Vec<TrackedFile> {
        let before = files.len();
        let kept: Vec<TrackedFile> = files.into_iter().filter(|f| self.includes(f)).collect();
        tracing::debug!(profile = %self.name, kept = kept.len(), dropped = before - kept.len(), "Applied sync profile");
        kept
    }
}

/// Look up a built-in profile by name, case-insensitively.
pub fn resolve_profile(name: &str) -> Result<SyncProfile> {
    SyncProfile::builtin_named(name).ok_or_else(|| Error::UnknownProfile {
        name: name.to_string(),
    })
}

/// The profile chosen with [`select_profile`], or `configured` when none
/// has been persisted.
pub fn active_profile(store: &dyn StateStore, configured: &str) -> Result<SyncProfile> {
    match store.get(keys::ACTIVE_PROFILE)? {
        Some(Value::String(name)) => resolve_profile(&name),
        Some(other) => Err(Error::State {
            message: format!("active profile is not a name: {other}"),
        }),
        None => resolve_profile(configured),
    }
}

/// Persist `name` as the active profile after checking it exists.
pub fn select_profile(store: &dyn StateStore, name: &str) -> Result<SyncProfile> {
    let profile = resolve_profile(name)?;
    store.set(keys::ACTIVE_PROFILE, Value::String(profile.name.clone()))?;
    tracing::info!(profile = %profile.name, "Selected sync profile");
    Ok(profile)
}
