use crate::{Coordinator, ReasonCode};
use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use tokio::task::JoinHandle;

pub mod panic;
pub mod signal;

/// A fatal or termination source, normalized before it reaches the
/// [`Coordinator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// A panic that nothing caught, with its rendered message and backtrace.
    UncaughtPanic {
        /// Rendered panic information.
        message: String,
    },

    /// An asynchronous task failed and nobody handled the failure.
    UnhandledFailure {
        /// Rendered failure.
        message: String,
        /// Whatever else is known about the failure, e.g. its debug form.
        context: Option<String>,
    },

    /// `SIGINT` (or Ctrl-C on non-Unix platforms).
    Interrupt,

    /// `SIGUSR1`.
    UserSignal1,

    /// `SIGUSR2`.
    UserSignal2,

    /// An explicit request to quit, optionally with a custom code.
    Quit(Option<ReasonCode>),
}

impl Trigger {
    /// Maps this trigger to the code the process will exit with.
    pub fn code(&self) -> ReasonCode {
        match self {
            Self::UncaughtPanic { .. } => ReasonCode::UNCAUGHT_PANIC,
            Self::UnhandledFailure { .. } => ReasonCode::UNHANDLED_FAILURE,
            Self::Interrupt => ReasonCode::INTERRUPT,
            Self::UserSignal1 => ReasonCode::USER_SIGNAL_1,
            Self::UserSignal2 => ReasonCode::USER_SIGNAL_2,
            Self::Quit(code) => code.unwrap_or(ReasonCode::QUIT),
        }
    }
}

impl Display for Trigger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UncaughtPanic { message } => write!(f, "Uncaught panic -> {}", message),
            Self::UnhandledFailure { message, context } => {
                write!(f, "Unhandled failure -> {}", message)?;

                if let Some(context) = context {
                    write!(f, "\n{}", context)?;
                }

                Ok(())
            }
            Self::Interrupt => f.write_str("SIGINT"),
            Self::UserSignal1 => f.write_str("SIGUSR1"),
            Self::UserSignal2 => f.write_str("SIGUSR2"),
            Self::Quit(code) => write!(f, "Quit ({})", code.unwrap_or(ReasonCode::QUIT)),
        }
    }
}

impl Coordinator {
    /// Forwards the given trigger into [`begin`](Coordinator::begin). The two
    /// error sources are logged through both sinks first.
    pub fn trigger(&self, trigger: Trigger) {
        if matches!(
            trigger,
            Trigger::UncaughtPanic { .. } | Trigger::UnhandledFailure { .. }
        ) {
            tracing::error!(alert = true, "{}", trigger);
            self.sinks().error(&trigger.to_string());
        }

        self.begin(trigger.code());
    }

    /// Asks for a shutdown with the given code, or with
    /// [`QUIT`](ReasonCode::QUIT) if none is given.
    pub fn quit(&self, code: Option<ReasonCode>) {
        self.trigger(Trigger::Quit(code));
    }

    /// Reports a failure that nobody is going to handle, which shuts the
    /// process down with [`UNHANDLED_FAILURE`](ReasonCode::UNHANDLED_FAILURE).
    pub fn report_unhandled(&self, error: impl Display, context: Option<String>) {
        self.trigger(Trigger::UnhandledFailure {
            message: error.to_string(),
            context,
        });
    }

    /// Spawns a task whose error, if it returns one, is
    /// [reported as unhandled](Coordinator::report_unhandled).
    ///
    /// The returned handle yields the task’s value, or `None` if it failed.
    pub fn spawn_supervised<F, T, E>(&self, future: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Debug + Display + Send + 'static,
    {
        let coordinator = self.clone();
        let task = async move {
            match future.await {
                Ok(value) => Some(value),
                Err(error) => {
                    let context = format!("{:?}", error);
                    coordinator.report_unhandled(error, Some(context));
                    None
                }
            }
        };

        match self.runtime() {
            Some(runtime) => runtime.spawn(task),
            None => tokio::spawn(task),
        }
    }
}
