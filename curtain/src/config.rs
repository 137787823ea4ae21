use crate::ConfigLoadError;
use config::{Config, Environment, File};
use curtain_core::slug::match_field;
use curtain_core::{DEFAULT_TIMEOUT, ReasonCode, ReasonTable};
#[cfg(feature = "tracing")]
use curtain_tracing::TracingConfig;
use serde::de::{Error, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt::Formatter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of the environment variables read by [`CurtainConfig::load`].
pub const ENV_PREFIX: &str = "CURTAIN";

/// Declarative shutdown settings, to be passed to
/// [`Setup::with_config`](crate::Setup::with_config).
///
/// Deserializes from any `serde` format. Keys are matched leniently
/// (`log_path`, `logPath` and `LOG-PATH` are the same key) and every key is
/// optional:
///
/// ```yaml
/// log_path: /var/log/app/exit.log
/// debug_label: app:exit
/// timeout: 3s
/// reason_codes:
///   42: Answer found
/// capture_panics: true
/// capture_signals: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurtainConfig {
    log_path: Option<PathBuf>,
    debug_label: Option<String>,
    reasons: ReasonTable,
    timeout: Duration,
    capture_panics: bool,
    capture_signals: bool,
    #[cfg(feature = "tracing")]
    tracing: Option<TracingConfig>,
}

impl CurtainConfig {
    /// Loads the config from the given file, if it exists, with
    /// `CURTAIN_*` environment variables layered on top.
    ///
    /// The file format is inferred from the extension (TOML or YAML). Nested
    /// keys in environment variables are separated by a double underscore:
    /// `CURTAIN_TRACING__LEVEL=debug`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);

        let proxy = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(environment)
            .build()
            .map_err(ConfigLoadError::Assemble)?;

        proxy.try_deserialize().map_err(ConfigLoadError::Deserialize)
    }
}

impl CurtainConfig {
    /// Sets the path of the structured exit log.
    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(log_path.into());

        self
    }

    /// Sets the label of the diagnostic logger.
    pub fn with_debug_label(mut self, debug_label: impl Into<String>) -> Self {
        self.debug_label = Some(debug_label.into());

        self
    }

    /// Adds or overrides a reason code description.
    pub fn with_reason(mut self, code: impl Into<ReasonCode>, description: impl AsRef<str>) -> Self {
        self.reasons.merge([(code.into(), description)]);

        self
    }

    /// Sets the forced-exit deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;

        self
    }

    /// Enables or disables turning panics into shutdowns.
    pub fn with_capture_panics(mut self, capture_panics: bool) -> Self {
        self.capture_panics = capture_panics;

        self
    }

    /// Enables or disables turning OS signals into shutdowns.
    pub fn with_capture_signals(mut self, capture_signals: bool) -> Self {
        self.capture_signals = capture_signals;

        self
    }

    /// Sets the logging configuration to initialize during setup.
    #[cfg(feature = "tracing")]
    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = Some(tracing);

        self
    }
}

impl CurtainConfig {
    /// Reports the path of the structured exit log, if any.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Reports the label of the diagnostic logger, if any.
    pub fn debug_label(&self) -> Option<&str> {
        self.debug_label.as_deref()
    }

    /// Reports the reason codes: the built-in ones plus the configured ones.
    pub fn reasons(&self) -> &ReasonTable {
        &self.reasons
    }

    /// Reports the forced-exit deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reports whether panics turn into shutdowns.
    pub fn capture_panics(&self) -> bool {
        self.capture_panics
    }

    /// Reports whether OS signals turn into shutdowns.
    pub fn capture_signals(&self) -> bool {
        self.capture_signals
    }

    /// Reports the logging configuration, if any.
    #[cfg(feature = "tracing")]
    pub fn tracing(&self) -> Option<&TracingConfig> {
        self.tracing.as_ref()
    }
}

impl Default for CurtainConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            debug_label: None,
            reasons: ReasonTable::builtin(),
            timeout: DEFAULT_TIMEOUT,
            capture_panics: true,
            capture_signals: true,
            #[cfg(feature = "tracing")]
            tracing: None,
        }
    }
}

impl AsRef<CurtainConfig> for CurtainConfig {
    fn as_ref(&self) -> &CurtainConfig {
        self
    }
}

const _: () = {
    #[derive(Clone, Copy)]
    enum Field {
        LogPath,
        DebugLabel,
        ReasonCodes,
        Timeout,
        CapturePanics,
        CaptureSignals,
        Tracing,
    }

    const FIELDS: &[(Field, &[&str])] = &[
        (Field::LogPath, &["log_path", "file"]),
        (Field::DebugLabel, &["debug_label", "label"]),
        (Field::ReasonCodes, &["reason_codes", "codes", "custom_codes"]),
        (Field::Timeout, &["timeout", "timeout_after"]),
        (Field::CapturePanics, &["capture_panics"]),
        (Field::CaptureSignals, &["capture_signals"]),
        (Field::Tracing, &["tracing", "logging"]),
    ];

    impl<'de> Deserialize<'de> for CurtainConfig {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(CurtainConfigVisitor)
        }
    }

    struct CurtainConfigVisitor;

    impl<'de> Visitor<'de> for CurtainConfigVisitor {
        type Value = CurtainConfig;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            formatter.write_str("a map of shutdown configuration")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut config = CurtainConfig::default();

            while let Some(key) = map.next_key::<String>()? {
                let Some(field) = match_field(&key, FIELDS) else {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                };

                match field {
                    Field::LogPath => config.log_path = map.next_value()?,
                    Field::DebugLabel => config.debug_label = map.next_value()?,
                    Field::ReasonCodes => config.reasons = map.next_value()?,
                    Field::Timeout => config.timeout = map.next_value::<Timeout>()?.0,
                    Field::CapturePanics => config.capture_panics = map.next_value()?,
                    Field::CaptureSignals => config.capture_signals = map.next_value()?,
                    #[cfg(feature = "tracing")]
                    Field::Tracing => config.tracing = map.next_value()?,
                    #[cfg(not(feature = "tracing"))]
                    Field::Tracing => {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
            }

            Ok(config)
        }
    }
};

/// A deadline given either as whole milliseconds or as a human-readable
/// duration (`"250ms"`, `"5s"`, `"1m 30s"`).
struct Timeout(Duration);

impl<'de> Deserialize<'de> for Timeout {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TimeoutVisitor)
    }
}

struct TimeoutVisitor;

impl<'de> Visitor<'de> for TimeoutVisitor {
    type Value = Timeout;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a number of milliseconds or a duration string such as `5s`")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Ok(Timeout(Duration::from_millis(value)))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        u64::try_from(value)
            .map(|millis| Timeout(Duration::from_millis(millis)))
            .map_err(|_| E::custom(format!("timeout cannot be negative, got {}", value)))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        let value = value.trim();

        // Bare numbers are milliseconds
        if let Ok(millis) = value.parse::<u64>() {
            return Ok(Timeout(Duration::from_millis(millis)));
        }

        humantime::parse_duration(value)
            .map(Timeout)
            .map_err(|error| E::custom(format!("invalid timeout '{}': {}", value, error)))
    }
}
