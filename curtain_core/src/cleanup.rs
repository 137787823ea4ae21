use crate::ReasonCode;
use futures::FutureExt;
use std::any::Any;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Tells each cleanup handler why the shutdown began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReason {
    code: ReasonCode,
    description: Arc<str>,
}

impl ShutdownReason {
    pub(crate) fn new(code: ReasonCode, description: Arc<str>) -> Self {
        Self { code, description }
    }

    /// The code that initiated the shutdown (and that the process will exit
    /// with).
    pub fn code(&self) -> ReasonCode {
        self.code
    }

    /// The human-readable description of the [code](ShutdownReason::code).
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Display for ShutdownReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code, self.description)
    }
}

/// Result types that a cleanup handler may resolve to.
///
/// Implemented for `()` (the handler cannot fail) and for `Result<(), E>`
/// with any displayable error `E`.
pub trait CleanupOutcome {
    /// Converts this outcome into a uniform shape, rendering any error.
    fn into_outcome(self) -> Result<(), String>;
}

impl CleanupOutcome for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E> CleanupOutcome for Result<(), E>
where
    E: Display,
{
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|error| error.to_string())
    }
}

/// Describes how a single cleanup handler failed. A failed handler never
/// aborts the shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanupError {
    /// The handler resolved to an error.
    #[error("cleanup handler #{index} failed: {message}")]
    Failed {
        /// Registration index of the handler.
        index: usize,
        /// Rendered error.
        message: String,
    },

    /// The handler panicked while being invoked, before yielding a future.
    #[error("cleanup handler #{index} panicked on invocation: {message}")]
    PanickedOnInvoke {
        /// Registration index of the handler.
        index: usize,
        /// Rendered panic payload.
        message: String,
    },

    /// The future returned by the handler panicked while being polled.
    #[error("cleanup handler #{index} panicked: {message}")]
    Panicked {
        /// Registration index of the handler.
        index: usize,
        /// Rendered panic payload.
        message: String,
    },
}

impl CleanupError {
    /// Registration index of the failed handler.
    pub fn index(&self) -> usize {
        match self {
            Self::Failed { index, .. }
            | Self::PanickedOnInvoke { index, .. }
            | Self::Panicked { index, .. } => *index,
        }
    }
}

type OutcomeFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
type CleanupCallback = Box<dyn FnOnce(ShutdownReason) -> OutcomeFuture + Send>;

/// An invoked handler: resolves to its registration index, or to the
/// [`CleanupError`] describing its failure.
pub(crate) type SettleFuture = Pin<Box<dyn Future<Output = Result<usize, CleanupError>> + Send>>;

/// A registered, not yet invoked unit of caller-supplied shutdown work.
pub(crate) struct CleanupHandler {
    index: usize,
    callback: CleanupCallback,
}

impl CleanupHandler {
    /// Wraps the given callback. Calling the callback happens synchronously on
    /// [invocation](CleanupHandler::invoke); awaiting its future happens later.
    pub(crate) fn new<F, Fut>(index: usize, callback: F) -> Self
    where
        F: FnOnce(ShutdownReason) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CleanupOutcome,
    {
        let callback: CleanupCallback = Box::new(move |reason| {
            let future = callback(reason);

            Box::pin(async move { future.await.into_outcome() })
        });

        Self { index, callback }
    }

    /// Reports the registration index of this handler.
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Consumes this handler, calling its callback right away. The returned
    /// future settles once the callback’s own future does; panics on either
    /// side are caught.
    pub(crate) fn invoke(self, reason: ShutdownReason) -> SettleFuture {
        let index = self.index;
        let callback = self.callback;

        match catch_unwind(AssertUnwindSafe(move || callback(reason))) {
            Ok(future) => Box::pin(async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(Ok(())) => Ok(index),
                    Ok(Err(message)) => Err(CleanupError::Failed { index, message }),
                    Err(payload) => Err(CleanupError::Panicked {
                        index,
                        message: panic_message(payload.as_ref()),
                    }),
                }
            }),
            Err(payload) => {
                let error = CleanupError::PanickedOnInvoke {
                    index,
                    message: panic_message(payload.as_ref()),
                };

                Box::pin(async move { Err(error) })
            }
        }
    }
}

/// Renders a panic payload, which is a string in all but exotic cases.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }

    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }

    String::from("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn reason() -> ShutdownReason {
        ShutdownReason::new(ReasonCode::QUIT, Arc::from("Programmatically quitting"))
    }

    #[tokio::test]
    async fn unit_outcome() {
        // Given
        let handler = CleanupHandler::new(7, |_| async {});

        // When
        let result = handler.invoke(reason()).await;

        // Then
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn error_outcome() {
        // Given
        let handler = CleanupHandler::new(1, |_| async { Err::<(), _>("disk on fire") });

        // When
        let result = handler.invoke(reason()).await;

        // Then
        assert_eq!(
            result,
            Err(CleanupError::Failed {
                index: 1,
                message: "disk on fire".into(),
            }),
        );
    }

    #[tokio::test]
    async fn callback_runs_on_invoke() {
        // Given
        let called = Arc::new(AtomicBool::new(false));
        let marker = Arc::clone(&called);
        let handler = CleanupHandler::new(0, move |reason: ShutdownReason| {
            marker.store(true, Ordering::SeqCst);
            assert_eq!(reason.code(), ReasonCode::QUIT);
            async {}
        });

        // When
        let future = handler.invoke(reason());

        // Then
        assert!(called.load(Ordering::SeqCst));
        assert_eq!(future.await, Ok(0));
    }

    #[tokio::test]
    async fn panic_on_invoke() {
        // Given
        let handler = CleanupHandler::new(2, |_| -> std::future::Ready<()> {
            panic!("too early");
        });

        // When
        let result = handler.invoke(reason()).await;

        // Then
        assert_eq!(
            result,
            Err(CleanupError::PanickedOnInvoke {
                index: 2,
                message: "too early".into(),
            }),
        );
    }

    #[tokio::test]
    async fn panic_while_awaited() {
        // Given
        let handler = CleanupHandler::new(3, |_| async {
            tokio::task::yield_now().await;
            if true {
                panic!("too late");
            }
        });

        // When
        let result = handler.invoke(reason()).await;

        // Then
        assert_eq!(result.unwrap_err().index(), 3);
    }
}
