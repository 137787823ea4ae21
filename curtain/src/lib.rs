#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

/// Implements the [`CurtainConfig`] configuration.
mod config;
pub use self::config::{CurtainConfig, ENV_PREFIX};

/// Implements the custom error types.
mod error;
pub use self::error::{ConfigLoadError, SetupError};

/// Implements the [`Setup`] builder and the [`setup`] entrypoint.
mod setup;
pub use self::setup::{Curtain, Setup, setup};

/// Implements the process-wide coordinator and its free-function facade.
mod global;
pub use self::global::{graceful_exit, installed, quit, report_unhandled, spawn_supervised};

/// Re-exports the public API of `curtain-core` in the root of this crate for
/// convenience.
pub use curtain_core::*;

/// Re-exports the public API of `curtain-tracing` for convenience.
#[cfg(feature = "tracing")]
pub use curtain_tracing;

/// Re-exports the public API of `tokio` for convenience.
pub use tokio;
