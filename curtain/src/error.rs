use config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Represents the ways in which [`setup`](crate::setup) may fail. Nothing is
/// installed when setup fails.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A coordinator has already been installed for this process.
    #[error("graceful shutdown is already set up for this process")]
    AlreadyInstalled,

    /// Setup was called outside of a Tokio runtime.
    #[error("graceful shutdown must be set up from within a Tokio runtime")]
    NoRuntime,

    /// The structured exit log could not be opened.
    #[error("failed to open the exit log at '{path}': {source}")]
    LogFile {
        /// The configured log path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Subscribing to OS signals failed.
    #[error("failed to subscribe to shutdown signals: {0}")]
    Signals(#[source] io::Error),

    /// The configured logging could not be initialized.
    #[cfg(feature = "tracing")]
    #[error(transparent)]
    Tracing(#[from] curtain_tracing::TracingInitError),
}

/// Represents the ways in which [loading](crate::CurtainConfig::load) the
/// configuration may fail.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The file or environment sources could not be read or parsed.
    #[error("failed to read the shutdown configuration sources: {0}")]
    Assemble(#[source] ConfigError),

    /// The sources were read, but did not describe a valid configuration.
    #[error("invalid shutdown configuration: {0}")]
    Deserialize(#[source] ConfigError),
}
