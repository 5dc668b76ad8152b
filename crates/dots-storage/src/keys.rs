//! Remote key layout

use dots_meta::TrackedFile;

use crate::{Error, Result};

/// Prefix under which all config objects live, with a trailing slash.
pub fn config_prefix(root: &str) -> String {
    let root = root.trim_matches('/');
    if root.is_empty() {
        "configs/".to_string()
    } else {
        format!("{root}/configs/")
    }
}

/// Remote key for a tracked file: `{root}/configs/{category}/{filename}`.
pub fn remote_key(root: &str, file: &TrackedFile) -> String {
    format!(
        "{}{}/{}",
        config_prefix(root),
        file.category.key_segment(),
        file.filename
    )
}

/// Refuse files the Safety Gate or an exclude pattern rejected.
pub fn ensure_transferable(file: &TrackedFile) -> Result<()> {
    if !file.is_safe {
        tracing::warn!(file = %file.relative_path, "Refusing to transfer unsafe file");
        return Err(Error::ContainsCredentials {
            path: file.path.clone(),
        });
    }
    Ok(())
}
