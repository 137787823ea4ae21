mod common;

#[cfg(test)]
mod tests {
    use crate::common::ExitProbe;
    use curtain::{CurtainConfig, ReasonCode, Setup};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::time::Duration;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("curtain-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        dir
    }

    #[tokio::test]
    async fn loaded_config_drives_setup() {
        // Given
        let dir = scratch_dir();
        let config_path = dir.join("curtain.yaml");
        let log_path = dir.join("exit.log");
        std::fs::write(
            &config_path,
            format!(
                "logPath: {}\ntimeout: 150ms\ncodes:\n  \"42\": Answer found\n",
                log_path.display(),
            ),
        )
        .unwrap();
        unsafe {
            std::env::set_var("CURTAIN_TIMEOUT", "2s");
            std::env::set_var("CURTAIN_CAPTURE_SIGNALS", "false");
            std::env::set_var("CURTAIN_CAPTURE_PANICS", "false");
        }

        // When
        let config = CurtainConfig::load(&config_path).unwrap();

        // Then
        assert_eq!(config.log_path(), Some(log_path.as_path()));
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert!(!config.capture_signals());
        assert!(!config.capture_panics());

        // When
        let probe = ExitProbe::new();
        curtain::setup(Setup::new().with_config(&config).terminator(probe.clone()))
            .await
            .unwrap();
        curtain::quit(Some(ReasonCode::new(42)));
        let code = probe.exited().await;

        // Then
        assert_eq!(code, ReasonCode::new(42));
        let written = std::fs::read_to_string(&log_path).unwrap();
        assert!(written.contains("INFO"));
        assert!(written.contains("Exiting with code: 42 - Answer found"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        // When
        let config = CurtainConfig::load(scratch_dir().join("absent.toml")).unwrap();

        // Then
        assert_eq!(config.reasons().describe(ReasonCode::QUIT), "Programmatically quitting");
        assert!(config.log_path().is_none());
    }
}
