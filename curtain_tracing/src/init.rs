use crate::{TracingConfig, make_layer};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Represents the ways in which installing the global subscriber may fail.
#[derive(Debug, Error)]
pub enum TracingInitError {
    /// A global default subscriber has already been installed.
    #[error("failed to install the global tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),

    /// A global `log` logger has already been installed.
    #[cfg(feature = "log")]
    #[error("failed to redirect `log` records into tracing: {0}")]
    Logger(#[from] tracing_log::log::SetLoggerError),
}

/// Installs a [`Registry`](tracing_subscriber::Registry) with the
/// [formatted layer](make_layer) as the global default subscriber.
///
/// With the `log` feature, records emitted through the `log` crate are
/// redirected into `tracing` as well.
pub fn init(config: impl AsRef<TracingConfig>) -> Result<(), TracingInitError> {
    #[cfg(feature = "log")]
    tracing_log::LogTracer::init()?;

    tracing_subscriber::registry()
        .with(make_layer(config))
        .try_init()?;

    Ok(())
}
