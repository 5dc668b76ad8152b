use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use dots_fs::{ConfigStore, NormalizedPath};
use serde_json::Value;

use crate::{Error, Result};

/// Keys the engine and CLI persist.
pub mod keys {
    pub const LAST_SYNC: &str = "last_sync";
    pub const ACTIVE_PROFILE: &str = "active_profile";
}

/// Opaque persisted key/value state.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;
}

type StateMap = BTreeMap<String, Value>;

fn poisoned() -> Error {
    Error::State {
        message: "state lock poisoned".into(),
    }
}

/// State persisted as one JSON object in a file.
///
/// Every `set` rewrites the whole file atomically.
#[derive(Debug)]
pub struct JsonStateStore {
    path: NormalizedPath,
    store: ConfigStore,
    write_lock: Mutex<()>,
}

impl JsonStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: NormalizedPath::new(path.as_ref()),
            store: ConfigStore::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    fn load(&self) -> Result<StateMap> {
        Ok(self.store.load_or_default::<StateMap>(&self.path)?)
    }
}

impl StateStore for JsonStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        let mut state = self.load()?;
        state.insert(key.to_string(), value);
        self.store.save(&self.path, &state)?;
        tracing::debug!(key = %key, path = %self.path, "Persisted state");
        Ok(())
    }
}

/// Non-persistent state, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<StateMap>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value);
        Ok(())
    }
}
