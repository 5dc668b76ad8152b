//! Scan command

use colored::Colorize;
use dots_catalog::Catalog;
use dots_meta::TrackedFile;

use crate::context::Context;
use crate::error::Result;

/// List discovered config files, narrowed to the active profile unless `all`.
pub fn run_scan(ctx: &Context, json: bool, all: bool) -> Result<()> {
    let files = if all {
        Catalog::new().scan(&ctx.scan_root()?)?
    } else {
        ctx.profiled_scan()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("{} No configuration files found", "!".yellow());
        return Ok(());
    }

    println!(
        "{} {} file(s) under {}",
        "=>".blue().bold(),
        files.len(),
        ctx.scan_root()?.display().to_string().cyan()
    );
    println!();
    for file in &files {
        println!("  {}", format_file_line(file));
    }
    Ok(())
}

fn format_file_line(file: &TrackedFile) -> String {
    let marker = if file.is_safe {
        "+".green()
    } else {
        "x".red()
    };
    let mut line = format!(
        "{} {:<9} {:<14} {}",
        marker,
        file.priority.to_string().dimmed(),
        file.category.as_str(),
        file.relative_path
    );
    if !file.is_safe {
        line.push_str(&format!(" {}", "(not synced: possible credentials)".yellow()));
    }
    line
}
