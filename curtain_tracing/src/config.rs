use crate::{FormatFlavor, Verbosity};
use curtain_core::slug::match_field;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt::Formatter;

pub mod flavor;
pub mod verbosity;

/// Describes the [formatted layer](tracing_subscriber::fmt::Layer) that
/// renders the process logs.
///
/// Every field is optional when deserializing; field names are matched
/// leniently (`show_target`, `showTarget` and `SHOW-TARGET` are the same key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    verbosity: Verbosity,
    flavor: FormatFlavor,
    color: bool,
    show_timestamp: bool,
    show_target: bool,
    show_level: bool,
    show_thread_id: bool,
    show_thread_name: bool,
    targets: BTreeMap<String, Verbosity>,
}

impl TracingConfig {
    /// Replaces the root [`Verbosity`] level.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;

        self
    }

    /// Replaces the [`FormatFlavor`].
    pub fn with_flavor(mut self, flavor: FormatFlavor) -> Self {
        self.flavor = flavor;

        self
    }

    /// Enables or disables colored output.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;

        self
    }

    /// Enables or disables the timestamp in the output.
    pub fn with_timestamp(mut self, show_timestamp: bool) -> Self {
        self.show_timestamp = show_timestamp;

        self
    }

    /// Merges an extra per-target [`Verbosity`] level into this config.
    pub fn with_target(mut self, target: impl Into<String>, verbosity: Verbosity) -> Self {
        self.targets.insert(target.into(), verbosity);

        self
    }
}

impl TracingConfig {
    /// Reports the root [verbosity level](Verbosity).
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Reports the [formatting flavor](FormatFlavor).
    pub fn flavor(&self) -> FormatFlavor {
        self.flavor
    }

    /// Reports whether the output is
    /// [colored](tracing_subscriber::fmt::Layer::with_ansi).
    pub fn color(&self) -> bool {
        self.color
    }

    /// Reports whether the output includes the timestamp.
    pub fn show_timestamp(&self) -> bool {
        self.show_timestamp
    }

    /// Reports whether the output includes the event target.
    pub fn show_target(&self) -> bool {
        self.show_target
    }

    /// Reports whether the output includes the level.
    pub fn show_level(&self) -> bool {
        self.show_level
    }

    /// Reports whether the output includes the thread ID.
    pub fn show_thread_id(&self) -> bool {
        self.show_thread_id
    }

    /// Reports whether the output includes the thread name.
    pub fn show_thread_name(&self) -> bool {
        self.show_thread_name
    }

    /// Reports the per-target [verbosity levels](Verbosity), which override the
    /// root level.
    pub fn targets(&self) -> &BTreeMap<String, Verbosity> {
        &self.targets
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            flavor: FormatFlavor::default(),
            color: true,
            show_timestamp: true,
            show_target: true,
            show_level: true,
            show_thread_id: false,
            show_thread_name: false,
            targets: BTreeMap::new(),
        }
    }
}

impl AsRef<TracingConfig> for TracingConfig {
    fn as_ref(&self) -> &TracingConfig {
        self
    }
}

const _: () = {
    #[derive(Clone, Copy)]
    enum Field {
        Verbosity,
        Flavor,
        Color,
        ShowTimestamp,
        ShowTarget,
        ShowLevel,
        ShowThreadId,
        ShowThreadName,
        Targets,
    }

    const FIELDS: &[(Field, &[&str])] = &[
        (Field::Verbosity, &["verbosity", "level"]),
        (Field::Flavor, &["flavor", "flavour", "format"]),
        (Field::Color, &["color", "colour", "with_color", "show_color", "ansi"]),
        (Field::ShowTimestamp, &["show_timestamp", "with_timestamp", "timestamp"]),
        (Field::ShowTarget, &["show_target", "with_target"]),
        (Field::ShowLevel, &["show_level", "with_level"]),
        (Field::ShowThreadId, &["show_thread_id", "with_thread_id", "thread_ids"]),
        (Field::ShowThreadName, &["show_thread_name", "with_thread_name", "thread_names"]),
        (Field::Targets, &["targets", "custom_targets", "target_verbosity"]),
    ];

    impl<'de> Deserialize<'de> for TracingConfig {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(TracingConfigVisitor)
        }
    }

    struct TracingConfigVisitor;

    impl<'de> Visitor<'de> for TracingConfigVisitor {
        type Value = TracingConfig;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            formatter.write_str("a map of tracing (logging) configuration")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut config = TracingConfig::default();

            while let Some(key) = map.next_key::<String>()? {
                let Some(field) = match_field(&key, FIELDS) else {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                };

                match field {
                    Field::Verbosity => config.verbosity = map.next_value()?,
                    Field::Flavor => config.flavor = map.next_value()?,
                    Field::Color => config.color = map.next_value()?,
                    Field::ShowTimestamp => config.show_timestamp = map.next_value()?,
                    Field::ShowTarget => config.show_target = map.next_value()?,
                    Field::ShowLevel => config.show_level = map.next_value()?,
                    Field::ShowThreadId => config.show_thread_id = map.next_value()?,
                    Field::ShowThreadName => config.show_thread_name = map.next_value()?,
                    Field::Targets => config.targets = map.next_value()?,
                }
            }

            Ok(config)
        }
    }
};

#[cfg(test)]
mod tests {
    use crate::{FormatFlavor, TracingConfig, Verbosity};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn from_empty() {
        // Given
        let input = "{}";
        let expected_output = TracingConfig::default();

        // When
        let actual_output = serde_yml::from_str::<TracingConfig>(input).unwrap();

        // Then
        assert_eq!(expected_output, actual_output);
    }

    #[test]
    fn from_map_sparse() {
        // Given
        let input = r#"
level: off
"#;
        let expected_output = TracingConfig::default().with_verbosity(Verbosity::Off);

        // When
        let actual_output = serde_yml::from_str::<TracingConfig>(input).unwrap();

        // Then
        assert_eq!(expected_output, actual_output);
    }

    #[test]
    fn from_map_full() {
        // Given
        let input = r#"
verbosity: warn
flavour: pretty
colour: false
showTimestamp: false
show-target: false
show_level: false
thread_ids: true
with_thread_name: true
unrelated: [1, 2, 3]
targets:
    tokio: off
    curtain_core::coordinator: debug
"#;
        let expected_output = TracingConfig {
            verbosity: Verbosity::Warn,
            flavor: FormatFlavor::Pretty,
            color: false,
            show_timestamp: false,
            show_target: false,
            show_level: false,
            show_thread_id: true,
            show_thread_name: true,
            targets: BTreeMap::from([
                ("tokio".to_string(), Verbosity::Off),
                ("curtain_core::coordinator".to_string(), Verbosity::Debug),
            ]),
        };

        // When
        let actual_output = serde_yml::from_str::<TracingConfig>(input).unwrap();

        // Then
        assert_eq!(expected_output, actual_output);
    }

    #[test]
    fn from_json() {
        // Given
        let input = r#"{"level": "debug", "flavor": "compact", "color": false}"#;
        let expected_output = TracingConfig::default()
            .with_verbosity(Verbosity::Debug)
            .with_flavor(FormatFlavor::Compact)
            .with_color(false);

        // When
        let actual_output = serde_json::from_str::<TracingConfig>(input).unwrap();

        // Then
        assert_eq!(expected_output, actual_output);
    }

    #[test]
    fn rejects_unknown_flavor() {
        // Given
        let input = r#"{"flavor": "fancy"}"#;

        // When
        let result = serde_json::from_str::<TracingConfig>(input);

        // Then
        assert!(result.is_err());
    }
}
