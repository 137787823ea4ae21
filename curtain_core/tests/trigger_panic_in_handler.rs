mod common;

#[cfg(test)]
mod tests {
    use crate::common::vehicle::ShutdownTestVehicle;
    use curtain_core::{PanicHook, ReasonCode};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn handler_panic_on_main_thread_does_not_hold_the_shutdown() {
        // Given
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let vehicle = ShutdownTestVehicle::customized(Duration::from_secs(2), |builder| {
            builder.runtime(runtime.handle().clone())
        });
        let invoked_before_exit = Arc::new(AtomicBool::new(false));

        vehicle.coordinator.register(|_| {
            if true {
                panic!("handler exploded");
            }
            async {}
        });
        vehicle.coordinator.register({
            let terminator = vehicle.terminator.clone();
            let invoked_before_exit = invoked_before_exit.clone();
            move |_| {
                invoked_before_exit.store(terminator.codes().is_empty(), Ordering::SeqCst);
                async {}
            }
        });
        PanicHook::install(&vehicle.coordinator);

        // When
        let started = Instant::now();
        let coordinator = vehicle.coordinator.clone();
        std::thread::Builder::new()
            .name("main".to_string())
            .spawn(move || coordinator.quit(None))
            .unwrap()
            .join()
            .unwrap();
        let code = runtime
            .block_on(async { tokio::time::timeout(Duration::from_secs(5), vehicle.exited()).await })
            .unwrap();

        // Then
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(invoked_before_exit.load(Ordering::SeqCst));
        assert_eq!(code, ReasonCode::QUIT);
        assert_eq!(vehicle.terminator.codes(), vec![ReasonCode::QUIT]);
        assert!(vehicle.primary.contains("error: Uncaught panic -> "));
        assert!(vehicle.primary.contains("Error on cleanup handler -> "));
        assert!(vehicle.diagnostic.contains("leaking"));
        assert!(!vehicle.diagnostic.contains("Cleanup timed out"));
        assert_eq!(vehicle.coordinator.progress().completed, 2);
    }
}
