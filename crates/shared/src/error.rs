//! Application-wide error types.

use thiserror::Error;

/// Startup and configuration failures.
///
/// Ledger failures have their own taxonomy in `cashdesk-core`.
#[derive(Debug, Error)]
pub enum AppError {
    /// A configuration value is present but unusable.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),
}
