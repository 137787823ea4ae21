use curtain_core::{Coordinator, CoordinatorBuilder, LogSink, ReasonCode, Terminator};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// A [`LogSink`] that remembers every message, prefixed with its flavor.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Returns all recorded lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Counts the recorded lines containing the given needle.
    pub fn count(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    /// Reports whether any recorded line contains the given needle.
    pub fn contains(&self, needle: &str) -> bool {
        self.count(needle) > 0
    }
}

impl LogSink for RecordingSink {
    fn log(&self, message: &str) {
        self.lines.lock().push(format!("log: {}", message));
    }

    fn info(&self, message: &str) {
        self.lines.lock().push(format!("info: {}", message));
    }

    fn error(&self, message: &str) {
        self.lines.lock().push(format!("error: {}", message));
    }
}

/// A [`Terminator`] that records exit codes instead of exiting.
pub struct RecordingTerminator {
    codes: Mutex<Vec<ReasonCode>>,
    sender: watch::Sender<Option<ReasonCode>>,
}

impl RecordingTerminator {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);

        Self {
            codes: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Returns every code the coordinator tried to exit with.
    pub fn codes(&self) -> Vec<ReasonCode> {
        self.codes.lock().clone()
    }

    /// Waits until the coordinator tries to exit, returning the code.
    pub async fn exited(&self) -> ReasonCode {
        let mut receiver = self.sender.subscribe();
        let code: Option<ReasonCode> = *receiver
            .wait_for(Option::is_some)
            .await
            .expect("sender is owned by self");

        code.expect("checked above")
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, code: ReasonCode) {
        self.codes.lock().push(code);
        self.sender.send_replace(Some(code));
    }
}

/// Helper struct wiring a [`Coordinator`] to recording sinks and terminator.
pub struct ShutdownTestVehicle {
    pub coordinator: Coordinator,
    pub primary: Arc<RecordingSink>,
    pub diagnostic: Arc<RecordingSink>,
    pub terminator: Arc<RecordingTerminator>,
}

impl ShutdownTestVehicle {
    /// Builds a coordinator with the given deadline.
    pub fn new(timeout: Duration) -> Self {
        Self::customized(timeout, |builder| builder)
    }

    /// Builds a coordinator with the given deadline, letting the caller
    /// customize the builder further.
    pub fn customized(
        timeout: Duration,
        customize: impl FnOnce(CoordinatorBuilder) -> CoordinatorBuilder,
    ) -> Self {
        let primary = Arc::new(RecordingSink::default());
        let diagnostic = Arc::new(RecordingSink::default());
        let terminator = Arc::new(RecordingTerminator::new());

        let builder = Coordinator::builder()
            .timeout(timeout)
            .shared_primary_sink(primary.clone())
            .shared_diagnostic_sink(diagnostic.clone())
            .shared_terminator(terminator.clone());

        Self {
            coordinator: customize(builder).build(),
            primary,
            diagnostic,
            terminator,
        }
    }

    /// Waits for the exit and returns its code.
    pub async fn exited(&self) -> ReasonCode {
        self.terminator.exited().await
    }
}
