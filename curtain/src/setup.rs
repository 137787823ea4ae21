use crate::{CurtainConfig, SetupError, global};
use curtain_core::{
    CleanupOutcome, Coordinator, CoordinatorBuilder, DiagnosticContext, FileSink, LabelSink,
    LogSink, PanicHook, ReasonCode, ShutdownReason, SignalListener, Terminator,
};
#[cfg(feature = "tracing")]
use curtain_tracing::TracingConfig;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

/// Collects everything [`setup`] needs to install the process-wide shutdown
/// coordinator.
///
/// By default, panics and OS signals are captured, nothing is logged and the
/// deadline is [`DEFAULT_TIMEOUT`](curtain_core::DEFAULT_TIMEOUT).
/// Explicitly given sinks take precedence over the ones described by a
/// [`CurtainConfig`], regardless of the order of calls.
pub struct Setup {
    builder: CoordinatorBuilder,
    log_path: Option<PathBuf>,
    debug_label: Option<String>,
    primary: Option<Arc<dyn LogSink>>,
    diagnostic: Option<Arc<dyn LogSink>>,
    capture_panics: bool,
    capture_signals: bool,
    #[cfg(feature = "tracing")]
    tracing: Option<TracingConfig>,
}

impl Setup {
    /// Starts with the defaults.
    pub fn new() -> Self {
        Self {
            builder: Coordinator::builder(),
            log_path: None,
            debug_label: None,
            primary: None,
            diagnostic: None,
            capture_panics: true,
            capture_signals: true,
            #[cfg(feature = "tracing")]
            tracing: None,
        }
    }

    /// Applies everything the given config describes.
    pub fn with_config(mut self, config: impl AsRef<CurtainConfig>) -> Self {
        let config = config.as_ref();

        self.log_path = config.log_path().map(PathBuf::from);
        self.debug_label = config.debug_label().map(str::to_string);
        self.capture_panics = config.capture_panics();
        self.capture_signals = config.capture_signals();
        self.builder = self
            .builder
            .reason_table(config.reasons())
            .timeout(config.timeout());

        #[cfg(feature = "tracing")]
        if let Some(tracing) = config.tracing() {
            self.tracing = Some(tracing.clone());
        }

        self
    }

    /// Registers a cleanup handler, awaited like any handler registered with
    /// [`graceful_exit`](crate::graceful_exit).
    pub fn callback<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnOnce(ShutdownReason) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CleanupOutcome,
    {
        self.builder = self.builder.callback(callback);

        self
    }

    /// Registers several cleanup handlers of the same type.
    pub fn callbacks<F, Fut>(mut self, callbacks: impl IntoIterator<Item = F>) -> Self
    where
        F: FnOnce(ShutdownReason) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CleanupOutcome,
    {
        self.builder = self.builder.callbacks(callbacks);

        self
    }

    /// Replaces the structured sink. Overrides the configured log path.
    pub fn primary_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.primary = Some(Arc::new(sink));

        self
    }

    /// Replaces the diagnostic sink. Overrides the configured debug label.
    pub fn diagnostic_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.diagnostic = Some(Arc::new(sink));

        self
    }

    /// Adds or overrides a reason code description.
    pub fn reason(mut self, code: impl Into<ReasonCode>, description: impl AsRef<str>) -> Self {
        self.builder = self.builder.reason(code, description);

        self
    }

    /// Sets the forced-exit deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.timeout(timeout);

        self
    }

    /// Replaces the final step of the shutdown, which by default exits the
    /// process.
    pub fn terminator(mut self, terminator: impl Terminator + 'static) -> Self {
        self.builder = self.builder.terminator(terminator);

        self
    }

    /// Enables or disables turning panics into shutdowns.
    pub fn capture_panics(mut self, capture_panics: bool) -> Self {
        self.capture_panics = capture_panics;

        self
    }

    /// Enables or disables turning OS signals into shutdowns.
    pub fn capture_signals(mut self, capture_signals: bool) -> Self {
        self.capture_signals = capture_signals;

        self
    }
}

impl Default for Setup {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle to the installed coordinator, returned by [`setup`].
#[derive(Clone)]
pub struct Curtain {
    coordinator: Coordinator,
}

impl Curtain {
    /// Exposes the [`DiagnosticContext`] attached to the exit report.
    pub fn context(&self) -> &DiagnosticContext {
        self.coordinator.context()
    }

    /// Exposes the installed [`Coordinator`].
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Waits until the shutdown begins.
    pub async fn terminated(&self) {
        self.coordinator.terminated().await;
    }
}

/// Installs the process-wide shutdown coordinator.
///
/// Handlers registered with [`graceful_exit`](crate::graceful_exit) before
/// this call are carried over. Depending on the [`Setup`], the panic hook and
/// the signal listener are installed too.
///
/// Fails without installing anything if setup already happened, if called
/// outside of a Tokio runtime, or if the configured logging cannot be set up.
/// A failure to subscribe to signals is reported after the coordinator is
/// installed.
pub async fn setup(setup: Setup) -> Result<Curtain, SetupError> {
    let runtime = Handle::try_current().map_err(|_| SetupError::NoRuntime)?;

    if global::installed().is_some() {
        return Err(SetupError::AlreadyInstalled);
    }

    #[cfg(feature = "tracing")]
    if let Some(tracing) = &setup.tracing {
        curtain_tracing::init(tracing)?;
    }

    let mut builder = setup.builder.runtime(runtime);

    if let Some(primary) = resolve_primary(setup.primary, setup.log_path)? {
        builder = builder.shared_primary_sink(primary);
    }

    if let Some(diagnostic) = resolve_diagnostic(setup.diagnostic, setup.debug_label) {
        builder = builder.shared_diagnostic_sink(diagnostic);
    }

    let coordinator = builder.build();
    global::install(&coordinator)?;

    if setup.capture_signals {
        SignalListener::listen(&coordinator).map_err(SetupError::Signals)?;
    }

    if setup.capture_panics {
        PanicHook::install(&coordinator);
    }

    info!(
        timeout = ?coordinator.timeout(),
        registered = coordinator.progress().registered,
        "Graceful shutdown set up",
    );

    Ok(Curtain { coordinator })
}

fn resolve_primary(
    explicit: Option<Arc<dyn LogSink>>,
    log_path: Option<PathBuf>,
) -> Result<Option<Arc<dyn LogSink>>, SetupError> {
    if explicit.is_some() {
        return Ok(explicit);
    }

    let Some(path) = log_path else {
        return Ok(None);
    };

    match FileSink::open(&path) {
        Ok(sink) => Ok(Some(Arc::new(sink))),
        Err(source) => Err(SetupError::LogFile { path, source }),
    }
}

fn resolve_diagnostic(
    explicit: Option<Arc<dyn LogSink>>,
    debug_label: Option<String>,
) -> Option<Arc<dyn LogSink>> {
    explicit.or_else(|| {
        debug_label.map(|label| Arc::new(LabelSink::new(label)) as Arc<dyn LogSink>)
    })
}
