//! Credential check and sanitize commands

use std::fs;
use std::path::Path;

use colored::Colorize;
use dots_safety::{CredentialFinding, SafetyGate, sanitize};

use crate::error::{CliError, Result};

/// Report credential-looking matches. Fails when any are found.
pub fn run_check_secrets(path: &Path) -> Result<()> {
    let findings = SafetyGate::new().scan_for_credentials(path)?;
    if findings.is_empty() {
        println!("{} No credentials found in {}", "OK".green().bold(), path.display());
        return Ok(());
    }

    println!("{} {}", "Potential credentials in".yellow(), path.display());
    for finding in &findings {
        println!("  {}", format_finding(finding));
    }
    Err(CliError::user(format!(
        "{} potential credential(s) found; this file will not be synced",
        findings.len()
    )))
}

/// Print the file with known credential fragments removed.
pub fn run_sanitize(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)?;
    print!("{}", sanitize(&text));
    Ok(())
}

fn format_finding(finding: &CredentialFinding) -> String {
    format!(
        "line {:>4}  {:<24} {}",
        finding.line,
        finding.pattern,
        finding.preview.dimmed()
    )
}
