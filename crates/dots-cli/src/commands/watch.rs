//! Watch command

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use dots_core::{ChangeWatcher, LogNotifier, SyncOnChange};

use crate::context::Context;
use crate::error::Result;

/// Watch tracked files until Ctrl-C.
pub async fn run_watch(ctx: &Context, auto_sync: bool) -> Result<()> {
    let engine = ctx.engine().await?;
    if let Err(e) = engine.reconcile().await {
        tracing::warn!(error = %e, "Initial reconciliation failed; watching anyway");
    }

    let auto_sync = auto_sync || ctx.config.watcher.auto_sync;
    let window = Duration::from_secs(ctx.config.watcher.debounce_secs);
    let handler = SyncOnChange::new(engine.clone(), Arc::new(LogNotifier), auto_sync);
    let watcher = ChangeWatcher::spawn(Arc::new(handler), window);

    let files = engine.tracked_files().await;
    let count = files.len();
    watcher.restart(files)?;

    let mode = if auto_sync { "uploading changes" } else { "reporting changes" };
    println!(
        "{} Watching {} file(s), {} after {}s of quiet. Press Ctrl-C to stop.",
        "=>".blue().bold(),
        count,
        mode,
        window.as_secs()
    );

    tokio::signal::ctrl_c().await?;
    println!();
    println!("{} Stopping watcher", "=>".blue().bold());
    watcher.stop().await;
    engine.shutdown();
    Ok(())
}
