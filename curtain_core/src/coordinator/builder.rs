use super::{Coordinator, DEFAULT_TIMEOUT, Inner};
use crate::cleanup::{CleanupHandler, CleanupOutcome, ShutdownReason};
use crate::sink::{LogSink, NoopSink};
use crate::terminate::{ProcessTerminator, Terminator};
use crate::{DiagnosticContext, ReasonCode, ReasonTable, ShutdownState, Sinks};
use parking_lot::{Condvar, Mutex};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Builds a [`Coordinator`].
///
/// Every option has a default: no cleanup handlers, [`NoopSink`]s, the
/// [built-in](ReasonTable::builtin) reason codes, a [`DEFAULT_TIMEOUT`]
/// deadline, the [`ProcessTerminator`] and the runtime that is current at the
/// time of [building](CoordinatorBuilder::build).
pub struct CoordinatorBuilder {
    handlers: Vec<CleanupHandler>,
    primary: Arc<dyn LogSink>,
    diagnostic: Arc<dyn LogSink>,
    reasons: ReasonTable,
    timeout: Duration,
    context: DiagnosticContext,
    terminator: Arc<dyn Terminator>,
    runtime: Option<Handle>,
}

impl CoordinatorBuilder {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Vec::new(),
            primary: Arc::new(NoopSink),
            diagnostic: Arc::new(NoopSink),
            reasons: ReasonTable::builtin(),
            timeout: DEFAULT_TIMEOUT,
            context: DiagnosticContext::new(),
            terminator: Arc::new(ProcessTerminator),
            runtime: None,
        }
    }

    /// Registers a cleanup handler up front. May be called repeatedly.
    pub fn callback<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnOnce(ShutdownReason) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CleanupOutcome,
    {
        let index = self.handlers.len();
        self.handlers.push(CleanupHandler::new(index, callback));

        self
    }

    /// Registers several cleanup handlers of the same type up front.
    pub fn callbacks<F, Fut>(mut self, callbacks: impl IntoIterator<Item = F>) -> Self
    where
        F: FnOnce(ShutdownReason) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CleanupOutcome,
    {
        for callback in callbacks {
            self = self.callback(callback);
        }

        self
    }

    /// Replaces the primary (structured) sink.
    pub fn primary_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.primary = Arc::new(sink);

        self
    }

    /// Replaces the primary sink with an already shared one.
    pub fn shared_primary_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.primary = sink;

        self
    }

    /// Replaces the diagnostic (label-oriented) sink.
    pub fn diagnostic_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.diagnostic = Arc::new(sink);

        self
    }

    /// Replaces the diagnostic sink with an already shared one.
    pub fn shared_diagnostic_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.diagnostic = sink;

        self
    }

    /// Adds a custom reason code, or re-describes a built-in one.
    pub fn reason(mut self, code: impl Into<ReasonCode>, description: impl AsRef<str>) -> Self {
        self.reasons.merge([(code.into(), description)]);

        self
    }

    /// Merges several custom reason codes.
    pub fn reasons<C, D>(mut self, custom: impl IntoIterator<Item = (C, D)>) -> Self
    where
        C: Into<ReasonCode>,
        D: AsRef<str>,
    {
        self.reasons.merge(custom);

        self
    }

    /// Merges all entries of the given table.
    pub fn reason_table(mut self, table: &ReasonTable) -> Self {
        self.reasons.merge(table.iter());

        self
    }

    /// Sets the forced-exit deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;

        self
    }

    /// Shares an existing [`DiagnosticContext`] instead of a fresh one.
    pub fn context(mut self, context: DiagnosticContext) -> Self {
        self.context = context;

        self
    }

    /// Replaces the [`Terminator`].
    pub fn terminator(mut self, terminator: impl Terminator + 'static) -> Self {
        self.terminator = Arc::new(terminator);

        self
    }

    /// Replaces the [`Terminator`] with an already shared one.
    pub fn shared_terminator(mut self, terminator: Arc<dyn Terminator>) -> Self {
        self.terminator = terminator;

        self
    }

    /// Pins the runtime that drives the cleanup handlers.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);

        self
    }

    /// Builds the coordinator in the [`Idle`](ShutdownState::Idle) state.
    pub fn build(self) -> Coordinator {
        let registered = self.handlers.len();
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());

        Coordinator {
            inner: Arc::new(Inner {
                state: Mutex::new(ShutdownState::Idle),
                exit_notice: Condvar::new(),
                handlers: Mutex::new(self.handlers),
                registered: AtomicUsize::new(registered),
                completed: AtomicUsize::new(0),
                exited: AtomicBool::new(false),
                reasons: self.reasons,
                sinks: Sinks::new(self.primary, self.diagnostic),
                timeout: self.timeout,
                context: self.context,
                terminator: self.terminator,
                runtime,
                terminated: CancellationToken::new(),
            }),
        }
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
