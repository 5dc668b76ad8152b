//! Debounced local change watcher
//!
//! Raw filesystem events from `notify` arrive on its own thread and are
//! forwarded over a channel to a single actor task. The actor owns the
//! watched set and one debounce timer per path (a [`DelayQueue`] entry).
//! A new event on a path resets its timer; expiry hands the file to a
//! [`ChangeHandler`]. Restarting clears every timer before the new set is
//! installed.

mod handler;

pub use handler::{ChangeHandler, SyncOnChange};

use std::collections::{BTreeSet, HashMap};
use std::future::poll_fn;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dots_meta::TrackedFile;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::time::{DelayQueue, delay_queue};

use crate::{Error, Result};

/// Default quiet period before a change is acted on.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(5);

const EDITOR_SUFFIXES: &[&str] = &[".swp", ".swo", ".swx", ".tmp", ".kate-swp", "~"];

/// Whether a path is an editor swap, backup, or temp file.
pub fn is_editor_artifact(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    // 4913 is vim's writability probe
    name == "4913" || name.starts_with(".#") || EDITOR_SUFFIXES.iter().any(|s| name.ends_with(s))
}

enum Command {
    Changed(PathBuf),
    Restart(Vec<TrackedFile>),
    Stop,
}

/// Handle to the watcher actor.
pub struct ChangeWatcher {
    commands: mpsc::UnboundedSender<Command>,
    subscription: Mutex<Option<RecommendedWatcher>>,
    task: JoinHandle<()>,
}

impl ChangeWatcher {
    /// Spawn the actor on the current runtime with nothing watched.
    pub fn spawn(handler: Arc<dyn ChangeHandler>, window: Duration) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let actor = Debouncer {
            window,
            handler,
            watched: HashMap::new(),
            timers: HashMap::new(),
            queue: DelayQueue::new(),
        };
        Self {
            commands,
            subscription: Mutex::new(None),
            task: tokio::spawn(actor.run(receiver)),
        }
    }

    /// Watch a new file set, cancelling every timer and subscription from
    /// the previous one.
    pub fn restart(&self, files: Vec<TrackedFile>) -> Result<()> {
        let mut subscription = self.subscription.lock().map_err(|_| Error::Watcher {
            message: "subscription lock poisoned".into(),
        })?;
        // Unsubscribe before the actor clears its timers so no stale event slips in
        *subscription = None;

        let directories: BTreeSet<PathBuf> = files
            .iter()
            .filter_map(|f| f.path.parent().map(Path::to_path_buf))
            .filter(|dir| dir.is_dir())
            .collect();
        let count = files.len();
        self.send(Command::Restart(files))?;

        if directories.is_empty() {
            return Ok(());
        }
        let forward = self.commands.clone();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            match event {
                Ok(event) if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) => {
                    for path in event.paths {
                        // Actor gone means the watcher is stopping
                        let _ = forward.send(Command::Changed(path));
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Filesystem notification error"),
            }
        })?;
        for dir in &directories {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }
        *subscription = Some(watcher);
        tracing::info!(files = count, directories = directories.len(), "Watching for changes");
        Ok(())
    }

    /// Feed one change event as if it came from the filesystem.
    pub fn record_change(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.send(Command::Changed(path.into()))
    }

    /// Stop watching and wait for the actor to exit.
    ///
    /// Pending timers are dropped without firing.
    pub async fn stop(self) {
        if let Ok(mut subscription) = self.subscription.lock() {
            *subscription = None;
        }
        let _ = self.commands.send(Command::Stop);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Watcher task ended abnormally");
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::Watcher {
            message: "watcher task has stopped".into(),
        })
    }
}

/// The single owner of watcher state.
struct Debouncer {
    window: Duration,
    handler: Arc<dyn ChangeHandler>,
    watched: HashMap<PathBuf, TrackedFile>,
    timers: HashMap<PathBuf, delay_queue::Key>,
    queue: DelayQueue<PathBuf>,
}

impl Debouncer {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Changed(path)) => self.on_change(path),
                    Some(Command::Restart(files)) => self.restart(files),
                    Some(Command::Stop) | None => break,
                },
                Some(expired) = poll_fn(|cx| self.queue.poll_expired(cx)), if !self.queue.is_empty() => {
                    self.fire(expired.into_inner());
                }
            }
        }
        tracing::debug!(pending = self.timers.len(), "Watcher stopped");
    }

    fn on_change(&mut self, path: PathBuf) {
        if is_editor_artifact(&path) || !self.watched.contains_key(&path) {
            return;
        }
        match self.timers.get(&path) {
            Some(key) => self.queue.reset(key, self.window),
            None => {
                let key = self.queue.insert(path.clone(), self.window);
                self.timers.insert(path.clone(), key);
            }
        }
        tracing::debug!(path = %path.display(), "Change recorded; debounce timer reset");
    }

    fn fire(&mut self, path: PathBuf) {
        self.timers.remove(&path);
        let Some(file) = self.watched.get(&path).cloned() else {
            return;
        };
        tracing::info!(file = %file.relative_path, "Change settled");
        let handler = Arc::clone(&self.handler);
        tokio::spawn(async move { handler.on_change(file).await });
    }

    fn restart(&mut self, files: Vec<TrackedFile>) {
        let cancelled = self.timers.len();
        self.queue.clear();
        self.timers.clear();
        self.watched = files.into_iter().map(|f| (f.path.clone(), f)).collect();
        tracing::debug!(cancelled, watched = self.watched.len(), "Watcher restarted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(".zshrc.swp", true)]
    #[case(".vimrc~", true)]
    #[case(".#init.el", true)]
    #[case("4913", true)]
    #[case(".zshrc.1234.tmp", true)]
    #[case(".zshrc", false)]
    #[case("config.json", false)]
    fn editor_artifacts(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_editor_artifact(&Path::new("/home/me").join(name)), expected);
    }
}
