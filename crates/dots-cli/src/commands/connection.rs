//! Test-connection command

use colored::Colorize;
use dots_storage::StorageBackend;

use crate::context::Context;
use crate::error::{CliError, Result};

pub async fn run_test_connection(ctx: &Context) -> Result<()> {
    let engine = ctx.engine().await?;
    let backend: &dyn StorageBackend = engine.backend();
    let kind = backend.kind();

    if backend.test_connection().await {
        println!("{} Connected to {} backend", "OK".green().bold(), kind.to_string().cyan());
        Ok(())
    } else {
        Err(CliError::user(format!(
            "Could not reach the {kind} backend; run with --verbose for details"
        )))
    }
}
