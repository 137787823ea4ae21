#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

/// Reason codes and their descriptions.
mod reason;
pub use self::reason::{ReasonCode, ReasonTable, UNKNOWN_REASON};

/// Diagnostic context attached to the exit report.
mod context;
pub use self::context::DiagnosticContext;

/// Logging capability the coordinator reports into.
mod sink;
pub use self::sink::file::FileSink;
pub use self::sink::label::LabelSink;
pub use self::sink::{LogSink, NoopSink, Sinks};

/// The final step of the shutdown.
mod terminate;
pub use self::terminate::{ProcessTerminator, Terminator};

/// Cleanup handler plumbing.
mod cleanup;
pub use self::cleanup::{CleanupError, CleanupOutcome, ShutdownReason};

/// The shutdown orchestrator and its state machine.
mod coordinator;
pub use self::coordinator::builder::CoordinatorBuilder;
pub use self::coordinator::state::{ShutdownProgress, ShutdownState};
pub use self::coordinator::{Coordinator, DEFAULT_TIMEOUT};

/// Trigger capture: signals, panics, unhandled failures, explicit quits.
mod trigger;
pub use self::trigger::Trigger;
pub use self::trigger::panic::PanicHook;
pub use self::trigger::signal::SignalListener;

/// Lenient matching of configuration keys.
pub mod slug;
