//! Push and pull commands

use colored::Colorize;
use dots_core::{SyncOptions, SyncReport};

use crate::context::Context;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Push,
    Pull,
}

/// Push or pull every file that needs it, or just the named files.
pub async fn run_transfer(
    ctx: &Context,
    direction: TransferDirection,
    paths: &[String],
    dry_run: bool,
) -> Result<()> {
    let engine = ctx.engine().await?;
    let options = SyncOptions { dry_run };

    if dry_run {
        println!("{} Dry run mode - no changes will be made", "=>".blue().bold());
    }

    let report = if paths.is_empty() {
        engine.reconcile().await?;
        match direction {
            TransferDirection::Push => engine.push(options).await?,
            TransferDirection::Pull => engine.pull(options).await?,
        }
    } else {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(engine.find(path).await?);
        }
        match direction {
            TransferDirection::Push => engine.upload_files(&files, options).await?,
            TransferDirection::Pull => engine.download_files(&files, options).await?,
        }
    };

    print_report(&report);
    if report.success {
        Ok(())
    } else {
        Err(CliError::user(format!("{} file(s) failed to transfer", report.failed())))
    }
}

fn print_report(report: &SyncReport) {
    if report.actions.is_empty() && report.errors.is_empty() {
        println!("{} Everything is up to date", "OK".green().bold());
        return;
    }
    for action in &report.actions {
        println!("  {} {}", "+".green(), action);
    }
    for error in &report.errors {
        println!("  {} {}", "x".red(), error);
    }
    if !report.operations.is_empty() {
        println!();
        println!(
            "{} {} completed, {} failed",
            "=>".blue().bold(),
            report.completed(),
            report.failed()
        );
    }
}
