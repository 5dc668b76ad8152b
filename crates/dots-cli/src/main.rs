//! dotsync CLI
//!
//! Scans the home directory for configuration files and keeps them in
//! sync with a cloud storage backend.

mod cli;
mod commands;
mod context;
mod error;

use std::path::Path;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use commands::TransferDirection;
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = dots_core::logging::init(cli.verbose) {
        eprintln!("{}: could not initialize logging: {}", "warning".yellow(), e);
    }

    let Some(command) = cli.command else {
        println!("{} Dotfile cloud sync", "dotsync".green().bold());
        println!();
        println!("Run {} for available commands.", "dotsync --help".cyan());
        return Ok(());
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(execute_command(command, cli.config.as_deref()))
}

async fn execute_command(cmd: Commands, config: Option<&Path>) -> Result<()> {
    let load = || Context::load(config);
    match cmd {
        Commands::Scan { json, all } => commands::run_scan(&load()?, json, all),
        Commands::Status { json } => commands::run_status(&load()?, json).await,
        Commands::Push { dry_run, paths } => {
            commands::run_transfer(&load()?, TransferDirection::Push, &paths, dry_run).await
        }
        Commands::Pull { dry_run, paths } => {
            commands::run_transfer(&load()?, TransferDirection::Pull, &paths, dry_run).await
        }
        Commands::Resolve { path, resolution } => {
            commands::run_resolve(&load()?, &path, resolution).await
        }
        Commands::Watch { auto_sync } => commands::run_watch(&load()?, auto_sync).await,
        Commands::TestConnection => commands::run_test_connection(&load()?).await,
        Commands::Profiles { select } => commands::run_profiles(&load()?, select.as_deref()),
        Commands::CheckSecrets { path } => commands::run_check_secrets(&path),
        Commands::Sanitize { path } => commands::run_sanitize(&path),
    }
}
