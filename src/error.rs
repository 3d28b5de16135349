//! Error types for the monitor's external boundaries.
//!
//! The core itself cannot fail; these cover loading settings and
//! rendering warnings.

use thiserror::Error;

/// Errors raised by a notification sink.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The rendering command could not be started.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The sink needs an async runtime and none is running.
    #[error("no async runtime available to run `{0}`")]
    NoRuntime(String),

    /// The receiving side of the sink has gone away.
    #[error("notification channel closed")]
    Closed,
}

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file or environment could not be read or parsed.
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// A setting was present but unusable.
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}
