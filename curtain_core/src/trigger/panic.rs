use crate::Coordinator;
use crate::trigger::Trigger;
use std::backtrace::Backtrace;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::warn;

/// How much longer than the deadline a panicking main thread waits before
/// forcing the exit itself.
const MAIN_THREAD_GRACE: Duration = Duration::from_millis(250);

/// Turns every panic in the process into an
/// [`UncaughtPanic`](Trigger::UncaughtPanic) trigger.
pub struct PanicHook;

impl PanicHook {
    /// Installs the hook, chaining to the previously installed one (which by
    /// default prints the panic to `stderr`).
    ///
    /// Panics inside Tokio tasks are caught by the runtime, so the process
    /// stays alive while the cleanup runs. A panic on the main thread would
    /// end the process as soon as unwinding completes; in that case the hook
    /// holds the main thread until the coordinator exits, forcing the exit
    /// itself shortly after the deadline.
    ///
    /// The main thread is not held when the panic happens after the shutdown
    /// already began (e.g., in a cleanup handler invoked from the main
    /// thread), nor when the main thread drives a current-thread runtime.
    pub fn install(coordinator: &Coordinator) {
        let coordinator = coordinator.clone();
        let previous = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            previous(info);

            // Sampled before triggering: the trigger may start the shutdown
            let already_begun = coordinator.state().has_begun();

            let backtrace = Backtrace::force_capture();
            coordinator.trigger(Trigger::UncaughtPanic {
                message: format!("{}\n{}", info, backtrace),
            });

            let holds = holds_thread(
                std::thread::current().name(),
                already_begun,
                drives_current_thread_runtime(),
            );

            if holds {
                let limit = coordinator.timeout() + MAIN_THREAD_GRACE;

                if coordinator.wait_exited_blocking(limit).is_none() {
                    warn!("Cleanup did not finish while the main thread was panicking");
                    coordinator.force_deadline();
                }
            }
        }));
    }
}

/// Decides whether the panicking thread must wait for the exit.
fn holds_thread(name: Option<&str>, already_begun: bool, drives_runtime: bool) -> bool {
    name == Some("main") && !already_begun && !drives_runtime
}

/// Reports whether the current thread is inside a current-thread runtime,
/// which cannot make progress while this thread is blocked.
fn drives_current_thread_runtime() -> bool {
    Handle::try_current()
        .map(|handle| handle.runtime_flavor() == RuntimeFlavor::CurrentThread)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_only_unrelated_main_thread_panics() {
        assert!(holds_thread(Some("main"), false, false));

        assert!(!holds_thread(Some("main"), true, false));
        assert!(!holds_thread(Some("main"), false, true));
        assert!(!holds_thread(Some("worker"), false, false));
        assert!(!holds_thread(None, false, false));
    }

    #[test]
    fn detects_current_thread_runtime() {
        assert!(!drives_current_thread_runtime());

        let current = tokio::runtime::Builder::new_current_thread().build().unwrap();
        current.block_on(async { assert!(drives_current_thread_runtime()) });

        let multi = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        multi.block_on(async { assert!(!drives_current_thread_runtime()) });
    }
}
