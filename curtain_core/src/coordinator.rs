use self::state::Transition;
use crate::cleanup::{CleanupHandler, CleanupOutcome, SettleFuture, ShutdownReason};
use crate::{DiagnosticContext, ReasonCode, ReasonTable, ShutdownProgress, ShutdownState, Sinks};
use crate::terminate::Terminator;
use parking_lot::{Condvar, Mutex};
use scopeguard::defer;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub mod builder;
mod spindown;
pub mod state;

/// Default forced-exit deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

const LEAK_WARNING: &str =
    "Shutdown triggered again while in progress: some error is leaking out of the cleanup";
const FORCE_EXIT_NOTICE: &str = "Forced exit on repeated SIGINT";
const TIMEOUT_NOTICE: &str = "Cleanup timed out";

fn stranded_warning(count: usize) -> String {
    format!("{} cleanup handler(s) registered too late; they will never run", count)
}

/// The shutdown orchestrator.
///
/// Owns the idempotency guard, the registry of cleanup handlers, the two
/// handler counters, the forced-exit deadline and the final exit report.
/// Every trigger source feeds into [`begin`](Coordinator::begin) (directly or
/// via [`trigger`](Coordinator::trigger)); only the first call starts the
/// shutdown sequence.
///
/// The coordinator is cheap to clone: all clones share the same state. One
/// coordinator is expected per process, although nothing but the installed
/// trigger sources makes it process-wide.
///
/// ## Example
///
/// ```
/// use curtain_core::{Coordinator, ReasonCode, Terminator};
/// use std::time::{Duration, Instant};
///
/// struct Observe;
///
/// impl Terminator for Observe {
///     fn terminate(&self, code: ReasonCode) {
///         println!("would exit with {}", code);
///     }
/// }
///
/// # tokio_test_block_on(async {
/// let coordinator = Coordinator::builder()
///     .timeout(Duration::from_secs(1))
///     .terminator(Observe)
///     .build();
///
/// coordinator.register(|reason| async move {
///     println!("cleaning up after {}", reason);
/// });
///
/// coordinator.quit(None);
/// coordinator.terminated().await;
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(future: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread()
/// #         .enable_all()
/// #         .build()
/// #         .unwrap()
/// #         .block_on(future)
/// # }
/// ```
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<ShutdownState>,
    exit_notice: Condvar,
    handlers: Mutex<Vec<CleanupHandler>>,
    registered: AtomicUsize,
    completed: AtomicUsize,
    exited: AtomicBool,
    reasons: ReasonTable,
    sinks: Sinks,
    timeout: Duration,
    context: DiagnosticContext,
    terminator: Arc<dyn Terminator>,
    runtime: Option<Handle>,
    terminated: CancellationToken,
}

impl Coordinator {
    /// Starts building a new coordinator.
    pub fn builder() -> builder::CoordinatorBuilder {
        builder::CoordinatorBuilder::new()
    }

    /// Registers a cleanup handler and returns its registration index.
    ///
    /// The handler is called at most once, when the shutdown begins, with the
    /// [`ShutdownReason`]. Its future is awaited concurrently with all other
    /// handlers; an error or a panic is logged and does not affect the rest of
    /// the sequence (nor the exit code).
    ///
    /// Handlers registered after the shutdown began are still invoked and
    /// awaited, within the same deadline. Handlers that arrive once the exit
    /// code is fixed are dropped with a warning to the diagnostic sink.
    pub fn register<F, Fut>(&self, callback: F) -> usize
    where
        F: FnOnce(ShutdownReason) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CleanupOutcome,
    {
        let mut handlers = self.inner.handlers.lock();
        let index = self.inner.registered.fetch_add(1, Ordering::SeqCst);

        // Checked under the lock: the exit inspects leftovers under it too
        if self.inner.exited.load(Ordering::SeqCst) {
            drop(handlers);
            warn!(index, "Cleanup handler registered after exit; it will never run");
            self.inner.sinks.diagnostic().log(&stranded_warning(1));
            return index;
        }

        handlers.push(CleanupHandler::new(index, callback));

        index
    }

    /// Feeds the given code into the shutdown state machine.
    ///
    /// - The first call starts the shutdown: all registered handlers are
    ///   invoked and the forced-exit deadline is armed.
    /// - An [interrupt](ReasonCode::INTERRUPT) arriving during the shutdown
    ///   exits immediately, without waiting for the handlers.
    /// - Any other repeated call only logs a leak warning.
    pub fn begin(&self, code: ReasonCode) {
        // Decide and record the transition before anything else happens
        let transition = self.inner.state.lock().advance(code);

        match transition {
            Transition::Started => self.start(code),
            Transition::ForceExit => {
                warn!(code = code.get(), "Repeated interrupt intercepted; exiting");
                self.inner.sinks.info(FORCE_EXIT_NOTICE);
                self.exit(code);
            }
            Transition::Leaked => {
                warn!(code = code.get(), "Shutdown triggered again while already in progress");
                self.inner.sinks.diagnostic().log(LEAK_WARNING);
            }
        }
    }

    /// Reports the current phase of the shutdown sequence.
    pub fn state(&self) -> ShutdownState {
        *self.inner.state.lock()
    }

    /// Reports the handler counters.
    pub fn progress(&self) -> ShutdownProgress {
        ShutdownProgress {
            registered: self.inner.registered.load(Ordering::SeqCst),
            completed: self.inner.completed.load(Ordering::SeqCst),
        }
    }

    /// Exposes the [`DiagnosticContext`] attached to the exit report.
    pub fn context(&self) -> &DiagnosticContext {
        &self.inner.context
    }

    /// Exposes the reason code descriptions.
    pub fn reasons(&self) -> &ReasonTable {
        &self.inner.reasons
    }

    /// Exposes the configured forced-exit deadline.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Waits until the shutdown begins. Completes immediately if it already
    /// has.
    ///
    /// Long-running tasks may `select!` on this to stop taking on new work.
    pub async fn terminated(&self) {
        self.inner.terminated.cancelled().await;
    }

    /// Reports whether the shutdown has begun as of this moment.
    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.is_cancelled()
    }

    /// Blocks the current thread until the exit code is fixed, or until the
    /// given limit elapses. Returns the exit code, if fixed by then.
    ///
    /// Must not be called from within an async task.
    pub fn wait_exited_blocking(&self, limit: Duration) -> Option<ReasonCode> {
        let deadline = Instant::now() + limit;
        let mut state = self.inner.state.lock();

        loop {
            if let Some(code) = state.exit_code() {
                return Some(code);
            }

            if self.inner.exit_notice.wait_until(&mut state, deadline).timed_out() {
                return state.exit_code();
            }
        }
    }
}

impl Coordinator {
    /// Runs the `Idle → ShuttingDown` transition.
    fn start(&self, code: ReasonCode) {
        let reason = self.reason(code);

        info!(code = code.get(), reason = reason.description(), "Shutdown initiated");

        // Unblock everyone waiting for the shutdown
        self.inner.terminated.cancel();

        // Without a runtime, handler futures could never be driven
        let Some(runtime) = self.runtime() else {
            error!("No async runtime available to drive the cleanup handlers");
            self.inner
                .sinks
                .error("Cannot run cleanup handlers: no async runtime available");
            self.exit(ReasonCode::CLEANUP_FAILURE);
            return;
        };

        // Handlers may spawn tasks from their synchronous part
        let _guard = runtime.enter();
        let invoked = self.invoke_registered(&reason);

        // Nothing to wait for
        if invoked.is_empty() {
            info!("No cleanup handlers registered");
            self.exit(code);
            return;
        }

        // No time to wait for anything
        if self.inner.timeout.is_zero() {
            self.timed_out(code);
            return;
        }

        runtime.spawn(spindown::run(self.clone(), reason, invoked));
    }

    /// Takes all currently registered handlers and invokes each of them, in
    /// registration order.
    fn invoke_registered(&self, reason: &ShutdownReason) -> Vec<SettleFuture> {
        let handlers = std::mem::take(&mut *self.inner.handlers.lock());

        handlers
            .into_iter()
            .map(|handler| {
                info!(index = handler.index(), "Invoking cleanup handler");
                handler.invoke(reason.clone())
            })
            .collect()
    }

    /// Accounts for a settled handler.
    fn settled(&self) {
        self.inner.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Exits after the forced-exit deadline elapsed.
    fn timed_out(&self, code: ReasonCode) {
        let progress = self.progress();

        warn!(
            completed = progress.completed,
            registered = progress.registered,
            "Cleanup handlers did not complete in time",
        );
        self.inner.sinks.info(TIMEOUT_NOTICE);

        self.exit(code);
    }

    /// Takes the timeout path right away, if the shutdown is still running.
    pub(crate) fn force_deadline(&self) {
        if let ShutdownState::ShuttingDown { origin } = self.state() {
            self.timed_out(origin);
        }
    }

    /// Fixes the exit code, emits the exit report and terminates. Only the
    /// first call has any effect.
    pub(crate) fn exit(&self, code: ReasonCode) {
        if self.inner.exited.swap(true, Ordering::SeqCst) {
            return;
        }

        *self.inner.state.lock() = ShutdownState::Exited { code };
        self.inner.exit_notice.notify_all();

        // Handlers that slipped in after the last invocation round
        let stranded = std::mem::take(&mut *self.inner.handlers.lock());
        if !stranded.is_empty() {
            warn!(count = stranded.len(), "Cleanup handlers left uninvoked at exit");
            self.inner
                .sinks
                .diagnostic()
                .log(&stranded_warning(stranded.len()));
        }

        // Terminate even if reporting blows up
        let terminator = Arc::clone(&self.inner.terminator);
        defer! { terminator.terminate(code) }

        self.report_exit(code);
    }

    fn report_exit(&self, code: ReasonCode) {
        let sinks = &self.inner.sinks;
        let context = &self.inner.context;

        if !context.is_empty() {
            let extra_info = context.to_json();

            sinks
                .diagnostic()
                .log(&format!("Exit diagnostic context: {}", extra_info));
            sinks.primary().info(&extra_info);
        }

        let message = format!(
            "(PID {}) Exiting with code: {} - {}",
            std::process::id(),
            code,
            self.inner.reasons.describe(code),
        );

        info!(code = code.get(), "{}", message);
        sinks.info(&message);
    }

    pub(crate) fn reason(&self, code: ReasonCode) -> ShutdownReason {
        ShutdownReason::new(code, self.inner.reasons.describe_shared(code))
    }

    pub(crate) fn sinks(&self) -> &Sinks {
        &self.inner.sinks
    }

    pub(crate) fn runtime(&self) -> Option<Handle> {
        self.inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
    }
}
