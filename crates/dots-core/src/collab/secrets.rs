use std::collections::HashMap;
use std::sync::Mutex;

use crate::{Error, Result};

/// Opaque credential storage addressed by name.
pub trait SecretStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    fn set(&self, name: &str, value: &str) -> Result<()>;
}

/// In-process store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, value: &str) -> Self {
        if let Ok(mut values) = self.values.lock() {
            values.insert(name.to_string(), value.to_string());
        }
        self
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, name: &str) -> Option<String> {
        self.values.lock().ok()?.get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| Error::Secrets {
            message: "secret store lock poisoned".into(),
        })?;
        values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Read-only store backed by `DOTSYNC_<NAME>` environment variables.
///
/// `aws-access-key-id` is read from `DOTSYNC_AWS_ACCESS_KEY_ID`.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self {
            prefix: "DOTSYNC_".into(),
        }
    }
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var_name(&self, name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

impl SecretStore for EnvSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(self.var_name(name))
            .ok()
            .filter(|v| !v.is_empty())
    }

    fn set(&self, name: &str, _value: &str) -> Result<()> {
        Err(Error::Secrets {
            message: format!(
                "environment secrets are read-only; export {} instead",
                self.var_name(name)
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemorySecretStore::new();
        assert_eq!(store.get("aws-access-key-id"), None);
        store.set("aws-access-key-id", "AKID").unwrap();
        assert_eq!(store.get("aws-access-key-id").as_deref(), Some("AKID"));
    }

    #[test]
    fn env_names_are_prefixed_and_upper_snake() {
        let store = EnvSecretStore::new();
        assert_eq!(store.var_name("aws-access-key-id"), "DOTSYNC_AWS_ACCESS_KEY_ID");
        assert_eq!(store.var_name("gcp-service-account-key"), "DOTSYNC_GCP_SERVICE_ACCOUNT_KEY");
    }

    #[test]
    fn env_store_is_read_only() {
        let store = EnvSecretStore::new();
        assert!(store.get("definitely-not-set-7f3a").is_none());
        assert!(matches!(store.set("x", "y"), Err(Error::Secrets { .. })));
    }
}
