use crate::{Coordinator, ShutdownState};
use crate::cleanup::{CleanupError, SettleFuture, ShutdownReason};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::pin::Pin;
use tokio::select;
use tokio::time::Sleep;
use tracing::{error, info, warn};

/// Helper enum for controlling the spindown logic flow.
enum SpindownState {
    Ongoing,
    Completed,
    TimedOut,
}

/// Awaits the already invoked handlers, then any handlers registered in the
/// meantime, in repeated cycles within a single shared deadline. Exits the
/// process with the originating code once there is nothing left to wait for,
/// or once the deadline elapses, whichever comes first.
pub(super) async fn run(coordinator: Coordinator, reason: ShutdownReason, invoked: Vec<SettleFuture>) {
    let code = reason.code();

    // Arm the forced-exit deadline
    let deadline = tokio::time::sleep(coordinator.timeout());
    tokio::pin!(deadline);

    let mut batch = invoked;

    loop {
        // Someone else fixed the exit code already
        if let ShutdownState::Exited { .. } = coordinator.state() {
            return;
        }

        // Pick up handlers registered during the previous cycle
        if batch.is_empty() {
            batch = coordinator.invoke_registered(&reason);
        }

        if batch.is_empty() {
            let progress = coordinator.progress();

            // Claim success once every registered handler settled
            if progress.is_complete() {
                info!(completed = progress.completed, "All cleanup handlers completed");
                coordinator.exit(code);
                return;
            }

            // A registration is underway; its handler lands on the next round
            tokio::task::yield_now().await;
            continue;
        }

        info!("Waiting for {} cleanup handler(s) to complete", batch.len());

        match spin_down_once(&coordinator, batch, deadline.as_mut()).await {
            SpindownState::TimedOut => {
                coordinator.timed_out(code);
                return;
            }
            _ => batch = Vec::new(),
        }
    }
}

/// Awaits a single batch of handlers until all settle or the deadline elapses.
async fn spin_down_once(
    coordinator: &Coordinator,
    batch: Vec<SettleFuture>,
    mut deadline: Pin<&mut Sleep>,
) -> SpindownState {
    let mut futures = batch.into_iter().collect::<FuturesUnordered<_>>();

    loop {
        let state = select! {
            biased;
            _ = deadline.as_mut() => receive_timeout(&futures),
            result = futures.next() => receive_outcome(coordinator, result, &futures),
        };

        match state {
            SpindownState::Ongoing => continue,
            other => return other,
        }
    }
}

fn receive_timeout(futures: &FuturesUnordered<SettleFuture>) -> SpindownState {
    warn!(
        remaining = futures.len(),
        "Some cleanup handlers did not complete in time",
    );

    SpindownState::TimedOut
}

fn receive_outcome(
    coordinator: &Coordinator,
    outcome: Option<Result<usize, CleanupError>>,
    futures: &FuturesUnordered<SettleFuture>,
) -> SpindownState {
    match outcome {
        Some(Ok(index)) => {
            info!(index, "Cleanup handler completed");
            coordinator.settled();
        }
        Some(Err(failure)) => {
            error!(index = failure.index(), "Cleanup handler failed: {}", failure);
            coordinator
                .sinks()
                .error(&format!("Error on cleanup handler -> {}", failure));
            coordinator.settled();
        }
        None => {
            error!("Polled cleanup futures while they are all already settled");
        }
    }

    // Check remaining handlers
    if futures.is_empty() {
        return SpindownState::Completed;
    }

    SpindownState::Ongoing
}
