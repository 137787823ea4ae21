use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub mod file;
pub mod label;

/// A minimal logging capability that the shutdown coordinator writes its
/// reports into.
///
/// Only [`log`](LogSink::log) is required. The [`info`](LogSink::info) and
/// [`error`](LogSink::error) flavors fall back to it unless overridden.
///
/// Any `Fn(&str)` closure is a sink.
pub trait LogSink: Send + Sync {
    /// Logs a message with no particular severity.
    fn log(&self, message: &str);

    /// Logs an informational message.
    fn info(&self, message: &str) {
        self.log(message);
    }

    /// Logs an error message.
    fn error(&self, message: &str) {
        self.log(message);
    }
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message)
    }
}

/// A [`LogSink`] that discards everything. Both sinks default to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _message: &str) {}
}

/// The pair of sinks the shutdown coordinator reports into, resolved once at
/// configuration time.
///
/// The `primary` sink is the structured (typically
/// [file-backed](file::FileSink)) logger. The `diagnostic` sink is the
/// secondary, [label-oriented](label::LabelSink) logger.
#[derive(Clone)]
pub struct Sinks {
    primary: Arc<dyn LogSink>,
    diagnostic: Arc<dyn LogSink>,
}

impl Sinks {
    /// Pairs up the given sinks.
    pub fn new(primary: Arc<dyn LogSink>, diagnostic: Arc<dyn LogSink>) -> Self {
        Self {
            primary,
            diagnostic,
        }
    }

    /// Exposes the primary sink.
    pub fn primary(&self) -> &dyn LogSink {
        self.primary.as_ref()
    }

    /// Exposes the diagnostic sink.
    pub fn diagnostic(&self) -> &dyn LogSink {
        self.diagnostic.as_ref()
    }

    /// Reports an error through both sinks.
    pub(crate) fn error(&self, message: &str) {
        self.primary.error(message);
        self.diagnostic.log(message);
    }

    /// Reports an informational message through both sinks.
    pub(crate) fn info(&self, message: &str) {
        self.primary.info(message);
        self.diagnostic.log(message);
    }
}

impl Default for Sinks {
    fn default() -> Self {
        Self::new(Arc::new(NoopSink), Arc::new(NoopSink))
    }
}

impl Debug for Sinks {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sinks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct LevelledSink {
        lines: Mutex<Vec<String>>,
    }

    impl LogSink for LevelledSink {
        fn log(&self, message: &str) {
            self.lines.lock().push(format!("log: {}", message));
        }

        fn error(&self, message: &str) {
            self.lines.lock().push(format!("error: {}", message));
        }
    }

    #[test]
    fn closure_is_a_sink() {
        // Given
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&lines);
        let sink = move |message: &str| captured.lock().push(message.to_string());

        // When
        sink.info("hello");
        sink.error("oops");

        // Then
        assert_eq!(*lines.lock(), vec!["hello".to_string(), "oops".to_string()]);
    }

    #[test]
    fn info_falls_back_to_log() {
        // Given
        let primary = Arc::new(LevelledSink::default());
        let sinks = Sinks::new(primary.clone(), Arc::new(NoopSink));

        // When
        sinks.info("one");
        sinks.error("two");

        // Then
        assert_eq!(
            *primary.lines.lock(),
            vec!["log: one".to_string(), "error: two".to_string()],
        );
    }
}
