#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

/// Implements the [`TracingConfig`] configuration section.
mod config;
pub use self::config::TracingConfig;
pub use self::config::flavor::FormatFlavor;
pub use self::config::verbosity::Verbosity;

/// Implements the custom formatted `tracing` layer.
mod fmt;
pub use self::fmt::make_layer;

/// Installs the formatted layer as the global default.
mod init;
pub use self::init::{TracingInitError, init};

/// Partly re-exports the public API of `tracing_*` for convenience.
pub use tracing_core::Subscriber;
pub use tracing_subscriber::Registry;
pub use tracing_subscriber::layer::SubscriberExt;
pub use tracing_subscriber::util::SubscriberInitExt;
