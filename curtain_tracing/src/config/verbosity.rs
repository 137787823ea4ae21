use curtain_core::slug::match_field;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt::Formatter;
use tracing_core::LevelFilter;

/// A thin wrapper around the `tracing` crate’s [`LevelFilter`], introduced to
/// provide lenient deserialization.
///
/// A verbosity level is “higher” if it is more verbose: [`Trace`](Verbosity::Trace)
/// is higher than [`Error`](Verbosity::Error).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    /// Log **nothing**.
    Off,

    /// Log at level [`ERROR`](tracing_core::Level::ERROR) only.
    Error,

    /// Log at level [`WARN`](tracing_core::Level::WARN) and lower.
    Warn,

    /// Log at level [`INFO`](tracing_core::Level::INFO) and lower.
    #[default]
    Info,

    /// Log at level [`DEBUG`](tracing_core::Level::DEBUG) and lower.
    Debug,

    /// Log **everything**.
    Trace,
}

const NAMES: &[(Verbosity, &[&str])] = &[
    (Verbosity::Off, &["off", "no", "none"]),
    (Verbosity::Error, &["error", "err"]),
    (Verbosity::Warn, &["warn", "warning"]),
    (Verbosity::Info, &["info"]),
    (Verbosity::Debug, &["debug"]),
    (Verbosity::Trace, &["trace", "all"]),
];

impl Verbosity {
    /// Translates this [`Verbosity`] level to the `tracing` crate’s
    /// [`LevelFilter`].
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

impl From<Verbosity> for LevelFilter {
    fn from(value: Verbosity) -> Self {
        value.to_level_filter()
    }
}

impl From<&Verbosity> for LevelFilter {
    fn from(value: &Verbosity) -> Self {
        value.to_level_filter()
    }
}

impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(VerbosityVisitor)
    }
}

struct VerbosityVisitor;

impl<'de> Visitor<'de> for VerbosityVisitor {
    type Value = Verbosity;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a verbosity level, such as `info` or `warn`")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        match_field(value, NAMES).ok_or_else(|| E::custom(format!("unknown verbosity `{}`", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aliases() {
        for (input, expected) in [
            ("\"NO\"", Verbosity::Off),
            ("\"err\"", Verbosity::Error),
            ("\"Warning\"", Verbosity::Warn),
            ("\"trace\"", Verbosity::Trace),
        ] {
            assert_eq!(serde_json::from_str::<Verbosity>(input).unwrap(), expected);
        }
    }

    #[test]
    fn unknown() {
        assert!(serde_json::from_str::<Verbosity>("\"loud\"").is_err());
    }

    #[test]
    fn ordering() {
        assert!(Verbosity::Trace > Verbosity::Error);
        assert!(Verbosity::Warn < Verbosity::Info);
        assert_eq!(LevelFilter::from(Verbosity::Debug), LevelFilter::DEBUG);
    }
}
