//! Logging setup and configuration

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Setup tracing subscriber for the application
///
/// Log output goes to stderr; stdout is reserved for transfer transcripts.
/// `RUST_LOG` takes precedence over `default_level`.
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|e| crate::Error::Config(format!("Logging already initialized: {}", e)))?;

    Ok(())
}

/// Pick the effective log level
///
/// An explicit `--log-level` wins, then the verbose flag (`debug`), then the
/// configured level.
pub fn log_level_for<'a>(explicit: Option<&'a str>, verbose: bool, configured: &'a str) -> &'a str {
    match explicit {
        Some(level) => level,
        None if verbose => "debug",
        None => configured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_precedence() {
        assert_eq!(log_level_for(Some("trace"), true, "info"), "trace");
        assert_eq!(log_level_for(None, true, "info"), "debug");
        assert_eq!(log_level_for(None, false, "warn"), "warn");
    }
}
