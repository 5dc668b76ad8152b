use std::sync::Arc;

use async_trait::async_trait;
use dots_meta::TrackedFile;

use crate::collab::Notifier;
use crate::sync::{SyncEngine, SyncOptions};

/// Reaction to a settled change on one watched file.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    async fn on_change(&self, file: TrackedFile);
}

/// Upload the changed file when auto-sync is on, otherwise notify.
pub struct SyncOnChange {
    engine: Arc<SyncEngine>,
    notifier: Arc<dyn Notifier>,
    auto_sync: bool,
}

impl SyncOnChange {
    pub fn new(engine: Arc<SyncEngine>, notifier: Arc<dyn Notifier>, auto_sync: bool) -> Self {
        Self {
            engine,
            notifier,
            auto_sync,
        }
    }
}

#[async_trait]
impl ChangeHandler for SyncOnChange {
    async fn on_change(&self, file: TrackedFile) {
        if !self.auto_sync {
            self.notifier.notify_file_changed(&file.filename);
            return;
        }

        match self
            .engine
            .upload_files(std::slice::from_ref(&file), SyncOptions::default())
            .await
        {
            Ok(report) if report.success => {
                tracing::info!(file = %file.relative_path, "Auto-synced change");
            }
            Ok(report) => {
                tracing::warn!(file = %file.relative_path, errors = ?report.errors, "Auto-sync failed");
            }
            Err(e) => {
                tracing::warn!(file = %file.relative_path, error = %e, "Auto-sync failed");
                self.notifier.notify_sync_failed(&e.to_string());
            }
        }
    }
}
