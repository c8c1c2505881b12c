//! `tracing` subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured filter. Installing a
//! subscriber twice (e.g. from several tests) is not an error.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{PreverError, Result};

/// Filter from `RUST_LOG`, falling back to `default_filter`
///
/// # Errors
///
/// Returns `InvalidConfiguration` if `default_filter` is not a valid directive
/// and `RUST_LOG` is unset.
pub fn env_filter(default_filter: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| {
            PreverError::InvalidConfiguration(format!("log filter '{default_filter}': {e}"))
        }),
    }
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns `InvalidConfiguration` for an unparseable filter.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = env_filter(default_filter)?;
    // Already installed: keep the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_filter() {
        assert!(env_filter("info,prever=debug").is_ok());
    }

    #[test]
    fn test_init_is_idempotent() {
        init("warn").expect("test");
        init("warn").expect("test");
    }
}
