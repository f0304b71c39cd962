//! Tracing setup
//!
//! Logs go to stderr so they never interleave with prompts on stdout.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber; `RUST_LOG` wins over `verbose`
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| format!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
