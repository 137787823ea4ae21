use curtain_core::slug::match_field;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt::Formatter;

/// A preset for the [event formatter](tracing_subscriber::fmt::format::Format)
/// of the formatted layer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatFlavor {
    /// Uses the default [`Full`](tracing_subscriber::fmt::format::Full) event formatting.
    #[default]
    Full,

    /// Uses the [`Compact`](tracing_subscriber::fmt::format::Compact) event formatting.
    Compact,

    /// Uses the multi-line [`Pretty`](tracing_subscriber::fmt::format::Pretty) event formatting.
    Pretty,

    /// Uses the [`Json`](tracing_subscriber::fmt::format::Json) event formatting.
    #[cfg(feature = "json")]
    Json,
}

const NAMES: &[(FormatFlavor, &[&str])] = &[
    (FormatFlavor::Full, &["full", "default"]),
    (FormatFlavor::Compact, &["compact"]),
    (FormatFlavor::Pretty, &["pretty"]),
    #[cfg(feature = "json")]
    (FormatFlavor::Json, &["json"]),
];

impl<'de> Deserialize<'de> for FormatFlavor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(FormatFlavorVisitor)
    }
}

struct FormatFlavorVisitor;

impl<'de> Visitor<'de> for FormatFlavorVisitor {
    type Value = FormatFlavor;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a format flavor, such as `full` or `compact`")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        match_field(value, NAMES)
            .ok_or_else(|| E::custom(format!("unknown format flavor `{}`", value)))
    }
}
