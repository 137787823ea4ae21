use crate::SetupError;
use curtain_core::{CleanupOutcome, Coordinator, ReasonCode, ShutdownReason};
use parking_lot::Mutex;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::sync::OnceLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

type StagedHandler = Box<dyn FnOnce(&Coordinator) + Send>;

/// The coordinator installed by [`setup`](crate::setup).
static COORDINATOR: OnceLock<Coordinator> = OnceLock::new();

/// Handlers registered before setup. Locked while installing, so that no
/// handler slips between draining and installing.
static STAGED: Mutex<Vec<StagedHandler>> = Mutex::new(Vec::new());

/// Returns the installed coordinator, if [`setup`](crate::setup) already
/// happened.
pub fn installed() -> Option<&'static Coordinator> {
    COORDINATOR.get()
}

pub(crate) fn install(coordinator: &Coordinator) -> Result<(), SetupError> {
    let mut staged = STAGED.lock();

    COORDINATOR
        .set(coordinator.clone())
        .map_err(|_| SetupError::AlreadyInstalled)?;

    for stage in staged.drain(..) {
        stage(coordinator);
    }

    Ok(())
}

/// Registers a cleanup handler with the process-wide coordinator.
///
/// Before [`setup`](crate::setup), the handler is staged and carried over
/// once setup happens. See [`Coordinator::register`] for how handlers are
/// run.
pub fn graceful_exit<F, Fut>(callback: F)
where
    F: FnOnce(ShutdownReason) -> Fut + Send + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: CleanupOutcome,
{
    let mut staged = STAGED.lock();

    match COORDINATOR.get() {
        Some(coordinator) => {
            drop(staged);
            coordinator.register(callback);
        }
        None => {
            debug!("Staging a cleanup handler until setup");
            staged.push(Box::new(move |coordinator: &Coordinator| {
                coordinator.register(callback);
            }));
        }
    }
}

/// Asks the process-wide coordinator to shut down, with the given code or
/// [`QUIT`](ReasonCode::QUIT).
///
/// Returns `false` if [`setup`](crate::setup) has not happened yet, in which
/// case nothing else happens either.
pub fn quit(code: Option<ReasonCode>) -> bool {
    let Some(coordinator) = COORDINATOR.get() else {
        warn!("Quit requested before graceful shutdown was set up; ignoring");
        return false;
    };

    coordinator.quit(code);

    true
}

/// Reports a failure nobody is going to handle to the process-wide
/// coordinator, which shuts down with
/// [`UNHANDLED_FAILURE`](ReasonCode::UNHANDLED_FAILURE).
///
/// Returns `false` if [`setup`](crate::setup) has not happened yet; the
/// failure is then only logged.
pub fn report_unhandled(error: impl Display, context: Option<String>) -> bool {
    let Some(coordinator) = COORDINATOR.get() else {
        error!(
            alert = true,
            error = %error,
            "Unhandled failure before graceful shutdown was set up",
        );
        return false;
    };

    coordinator.report_unhandled(error, context);

    true
}

/// Spawns a task on the current runtime whose error, if it returns one, is
/// [reported as unhandled](report_unhandled).
///
/// May be called before [`setup`](crate::setup): the coordinator is looked up
/// when the task fails.
pub fn spawn_supervised<F, T, E>(future: F) -> JoinHandle<Option<T>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Debug + Display + Send + 'static,
{
    if let Some(coordinator) = COORDINATOR.get() {
        return coordinator.spawn_supervised(future);
    }

    tokio::spawn(async move {
        match future.await {
            Ok(value) => Some(value),
            Err(error) => {
                let context = format!("{:?}", error);
                report_unhandled(error, Some(context));
                None
            }
        }
    })
}
