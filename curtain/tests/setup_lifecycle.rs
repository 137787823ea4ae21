mod common;

#[cfg(test)]
mod tests {
    use crate::common::{ExitProbe, Journal};
    use curtain::{ReasonCode, Setup, SetupError};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn full_lifecycle() {
        // Given
        let calls = Arc::new(Mutex::new(Vec::new()));
        let probe = ExitProbe::new();
        let journal = Journal::default();

        // When: nothing set up yet
        let staged = Arc::clone(&calls);
        curtain::graceful_exit(move |reason| async move {
            sleep(Duration::from_millis(20)).await;
            staged.lock().push(format!("staged: {}", reason.code()));
        });

        // Then
        assert!(curtain::installed().is_none());
        assert!(!curtain::quit(None));
        assert_eq!(probe.code(), None);

        // When
        let from_setup = Arc::clone(&calls);
        let curtain = curtain::setup(
            Setup::new()
                .capture_panics(false)
                .capture_signals(false)
                .timeout(Duration::from_secs(5))
                .primary_sink(journal.clone())
                .terminator(probe.clone())
                .callback(move |_| async move {
                    from_setup.lock().push("setup".to_string());
                }),
        )
        .await
        .unwrap();

        // Then
        assert!(curtain::installed().is_some());
        assert_eq!(curtain.coordinator().progress().registered, 2);

        // When
        let again = curtain::setup(Setup::new().terminator(probe.clone())).await;

        // Then
        assert!(matches!(again, Err(SetupError::AlreadyInstalled)));

        // When
        let late = Arc::clone(&calls);
        curtain::graceful_exit(move |_| async move {
            late.lock().push("late".to_string());
            Err::<(), _>("flush failed")
        });
        curtain.context().insert("worker", "ingest").unwrap();
        assert!(curtain::quit(None));
        let code = probe.exited().await;

        // Then
        assert_eq!(code, ReasonCode::QUIT);
        assert!(curtain.coordinator().is_terminated());
        let mut calls = calls.lock().clone();
        calls.sort();
        assert_eq!(calls, vec!["late", "setup", "staged: 101"]);
        assert!(journal.contains(r#"{"worker":"ingest"}"#));
        assert!(journal.contains("flush failed"));
        assert!(journal.contains("Exiting with code: 101 - Programmatically quitting"));

        // When: after the exit, everything is ignored
        assert!(curtain::report_unhandled("too late", None));
        assert_eq!(probe.code(), Some(ReasonCode::QUIT));
    }
}
