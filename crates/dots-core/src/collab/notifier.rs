use std::sync::Mutex;

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);

    fn notify_sync_completed(&self, file_count: usize) {
        self.notify("Sync Complete", &format!("Successfully synced {file_count} file(s)"));
    }

    fn notify_conflicts_detected(&self, count: usize) {
        self.notify(
            "Sync Conflicts",
            &format!("{count} file(s) have conflicts that need resolution"),
        );
    }

    fn notify_sync_failed(&self, error: &str) {
        self.notify("Sync Failed", error);
    }

    fn notify_file_changed(&self, filename: &str) {
        self.notify("File Changed", &format!("{filename} has been modified"));
    }
}

/// Notifier that writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title = %title, "{body}");
    }
}

/// Notifier that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(title, body)` pairs in arrival order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn titles(&self) -> Vec<String> {
        self.entries().into_iter().map(|(title, _)| title).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((title.to_string(), body.to_string()));
        }
    }
}
