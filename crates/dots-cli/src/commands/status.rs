//! Status command

use colored::{ColoredString, Colorize};
use dots_core::EngineSnapshot;
use dots_meta::{SyncState, SyncStatus};

use crate::context::Context;
use crate::error::Result;

/// Reconcile against the remote and print per-file state.
pub async fn run_status(ctx: &Context, json: bool) -> Result<()> {
    let engine = ctx.engine().await?;
    engine.reconcile().await?;
    let snapshot = engine.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    print_snapshot(ctx, &snapshot);
    Ok(())
}

fn print_snapshot(ctx: &Context, snapshot: &EngineSnapshot) {
    println!("{}", "Sync Status".bold());
    println!();
    println!("   {}: {}", "Config".dimmed(), ctx.config_path.display());
    println!("  {}: {}", "Profile".dimmed(), ctx.config.active_profile.cyan());
    let last_sync = snapshot
        .last_sync
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    println!("{}: {}", "Last sync".dimmed(), last_sync);
    if !snapshot.checksum_comparison {
        println!(
            "{} backend does not report checksums; conflicts are detected by time only",
            "!".yellow()
        );
    }
    println!();

    if snapshot.statuses.is_empty() {
        println!("{} No tracked files", "!".yellow());
    }
    for status in &snapshot.statuses {
        println!("  {:<14} {}", state_label(status.state), describe(status));
    }

    if !snapshot.remote_only.is_empty() {
        println!();
        println!("{}", "Only on remote:".bold());
        for object in &snapshot.remote_only {
            println!("  {}", object.key.dimmed());
        }
    }

    let conflicts = snapshot.conflicts().len();
    if conflicts > 0 {
        println!();
        println!(
            "{} {} conflict(s); run {} to choose a side",
            "!".yellow(),
            conflicts,
            "dotsync resolve <file> --use <side>".cyan()
        );
    }
}

fn describe(status: &SyncStatus) -> String {
    match &status.error {
        Some(error) => format!("{} ({})", status.file.relative_path, error),
        None => status.file.relative_path.clone(),
    }
}

fn state_label(state: SyncState) -> ColoredString {
    let label = state.to_string();
    match state {
        SyncState::Synced => label.green(),
        SyncState::LocalNewer | SyncState::NotOnRemote => label.cyan(),
        SyncState::RemoteNewer | SyncState::NotOnLocal => label.blue(),
        SyncState::Conflict => label.yellow().bold(),
        SyncState::Error => label.red(),
    }
}
