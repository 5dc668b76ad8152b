//! Resolve command

use colored::Colorize;
use dots_core::ResolutionOutcome;
use dots_meta::{ConflictResolution, SyncState};

use crate::context::Context;
use crate::error::{CliError, Result};

/// Apply a conflict resolution to one tracked file.
pub async fn run_resolve(ctx: &Context, path: &str, resolution: ConflictResolution) -> Result<()> {
    let engine = ctx.engine().await?;
    let statuses = engine.reconcile().await?;
    let file = engine.find(path).await?;

    let state = statuses
        .iter()
        .find(|s| s.file.id == file.id)
        .map(|s| s.state);
    if state != Some(SyncState::Conflict) {
        println!(
            "{} {} is not in conflict; applying '{}' anyway",
            "!".yellow(),
            file.relative_path,
            resolution
        );
    }

    match engine.resolve_conflict(&file, resolution).await? {
        ResolutionOutcome::Transferred(report) => {
            for action in &report.actions {
                println!("  {} {}", "+".green(), action);
            }
            if !report.success {
                return Err(CliError::user(report.errors.join("; ")));
            }
            println!("{} Resolved {}", "OK".green().bold(), file.relative_path);
        }
        ResolutionOutcome::Skipped => {
            println!("{} Left {} unresolved", "=>".blue().bold(), file.relative_path);
        }
        ResolutionOutcome::MergeRequested { local, remote_key } => {
            println!("{} Merge {} by hand:", "=>".blue().bold(), file.relative_path);
            println!("   local:  {}", local.display());
            println!("   remote: {}", remote_key);
            println!(
                "Then run {} to publish the merged file.",
                format!("dotsync resolve {} --use local", file.relative_path).cyan()
            );
        }
    }
    Ok(())
}
