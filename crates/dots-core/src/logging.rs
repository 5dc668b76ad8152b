use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize a tracing subscriber for the `dotsync` process.
///
/// The filter comes from `RUST_LOG` when set, otherwise `info`
/// (or `debug` when `verbose` is true).
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    let default_level = if verbose { "debug" } else { "info" };
    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, warn};

    #[test]
    fn init_twice_reports_error_instead_of_panicking() {
        // Only one global subscriber per process
        let _ = init(false);
        assert!(init(true).is_err());

        info!(file = ".zshrc", "Logging initialized");
        warn!("Second init rejected");
    }
}
