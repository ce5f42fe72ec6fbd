//! Tracing subscriber setup
//!
//! Components log through `tracing` under these targets:
//! - `formgate::token`, `formgate::context`, `formgate::session`
//! - `formgate::store`, `formgate::reconcile`
//! - `formgate::lifecycle` (one `request` span per request)

use crate::config::{LogFormat, LoggingConfig};
use formgate_core::{FormgateError, FormgateResult};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber for `config`
///
/// `RUST_LOG`, when set and valid, takes precedence over `config.level`.
/// Returns `Ok(false)` if a global subscriber was already installed.
///
/// # Errors
///
/// Returns `FormgateError::Config` if `config.level` is not a valid filter.
pub fn init_tracing(config: &LoggingConfig) -> FormgateResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    Ok(installed.is_ok())
}

fn build_filter(level: &str) -> FormgateResult<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| FormgateError::config(format!("Invalid logging.level '{}': {}", level, e)))
}
