//! Logging setup
//!
//! All modules log through `tracing`. Binaries call [`init_logging`] once at
//! start-up; `RUST_LOG` overrides the default filter.

use crate::error::CoreError;
use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "vanguard_core=info";

/// Install the global fmt subscriber
///
/// Returns [`CoreError::Logging`] when a global subscriber is already set.
pub fn init_logging(default_filter: &str) -> Result<(), CoreError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| CoreError::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| CoreError::Logging(e.to_string()))?;

    tracing::info!("Logging initialised (default filter: {})", default_filter);
    Ok(())
}
