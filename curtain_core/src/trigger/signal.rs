use crate::Coordinator;
use crate::trigger::Trigger;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Subscribes the [`Coordinator`] to the OS termination signals.
pub struct SignalListener;

// Guards against forwarding every signal more than once
static LISTENING: AtomicBool = AtomicBool::new(false);

impl SignalListener {
    /// Starts forwarding OS signals to the given coordinator, replacing the
    /// default handling of these signals for the whole process.
    ///
    /// On Unix, `SIGINT`, `SIGUSR1` and `SIGUSR2` are intercepted. Elsewhere,
    /// only Ctrl-C is. Every delivery is forwarded, for as long as the process
    /// lives: a repeated `SIGINT` must still reach the coordinator to force
    /// the exit.
    ///
    /// The signal subscriptions are in place by the time this function
    /// returns. Returns `Ok(false)` without doing anything if signals are
    /// already being forwarded.
    pub fn listen(coordinator: &Coordinator) -> io::Result<bool> {
        let Some(runtime) = coordinator.runtime() else {
            return Err(io::Error::other("no async runtime to listen for signals on"));
        };

        // If already listening, pull a no-op
        if LISTENING.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        let _guard = runtime.enter();

        if let Err(error) = Self::subscribe(&runtime, coordinator) {
            LISTENING.store(false, Ordering::SeqCst);
            return Err(error);
        }

        info!("Listening for shutdown signals");

        Ok(true)
    }

    #[cfg(unix)]
    fn subscribe(runtime: &tokio::runtime::Handle, coordinator: &Coordinator) -> io::Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let interrupt = signal(SignalKind::interrupt())?;
        let user_defined1 = signal(SignalKind::user_defined1())?;
        let user_defined2 = signal(SignalKind::user_defined2())?;

        runtime.spawn(forward(interrupt, coordinator.clone(), Trigger::Interrupt));
        runtime.spawn(forward(user_defined1, coordinator.clone(), Trigger::UserSignal1));
        runtime.spawn(forward(user_defined2, coordinator.clone(), Trigger::UserSignal2));

        Ok(())
    }

    #[cfg(not(unix))]
    fn subscribe(runtime: &tokio::runtime::Handle, coordinator: &Coordinator) -> io::Result<()> {
        let coordinator = coordinator.clone();

        runtime.spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C intercepted");
                coordinator.trigger(Trigger::Interrupt);
            }
        });

        Ok(())
    }
}

/// Forwards every delivery of the given signal as the given trigger.
#[cfg(unix)]
async fn forward(mut signal: tokio::signal::unix::Signal, coordinator: Coordinator, trigger: Trigger) {
    while signal.recv().await.is_some() {
        info!(signal = %trigger, "Signal intercepted");
        coordinator.trigger(trigger.clone());
    }
}
