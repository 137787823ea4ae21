use serde::de::{Error, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Description reported for any [`ReasonCode`] missing from a [`ReasonTable`].
pub const UNKNOWN_REASON: &str = "unknown";

/// Integer tag identifying why the shutdown began. The same integer becomes
/// the exit code of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReasonCode(i32);

impl ReasonCode {
    /// A panic was not caught anywhere in the process.
    pub const UNCAUGHT_PANIC: Self = Self(1);

    /// An asynchronous task failed without anyone handling the failure.
    pub const UNHANDLED_FAILURE: Self = Self(2);

    /// The interrupt signal (`SIGINT`, Ctrl-C) was delivered.
    pub const INTERRUPT: Self = Self(3);

    /// The first user-defined signal (`SIGUSR1`) was delivered.
    pub const USER_SIGNAL_1: Self = Self(4);

    /// The second user-defined signal (`SIGUSR2`) was delivered.
    pub const USER_SIGNAL_2: Self = Self(5);

    /// The cleanup sequence itself could not be carried out.
    pub const CLEANUP_FAILURE: Self = Self(100);

    /// The process was asked to quit programmatically.
    pub const QUIT: Self = Self(101);

    /// Wraps an arbitrary integer code.
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Returns the wrapped integer, suitable for [`std::process::exit`].
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for ReasonCode {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<ReasonCode> for i32 {
    fn from(value: ReasonCode) -> Self {
        value.0
    }
}

impl Display for ReasonCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Maps every [`ReasonCode`] to a human-readable description.
///
/// The table always contains the built-in codes. Custom entries may be
/// [merged](ReasonTable::merge) into it to add new codes or to re-describe
/// existing ones; nothing is ever removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonTable {
    descriptions: BTreeMap<ReasonCode, Arc<str>>,
}

impl ReasonTable {
    /// Creates a table holding only the built-in codes.
    pub fn builtin() -> Self {
        let descriptions = [
            (ReasonCode::UNCAUGHT_PANIC, "Uncaught panic"),
            (ReasonCode::UNHANDLED_FAILURE, "Unhandled async failure"),
            (ReasonCode::INTERRUPT, "SIGINT"),
            (ReasonCode::USER_SIGNAL_1, "SIGUSR1"),
            (ReasonCode::USER_SIGNAL_2, "SIGUSR2"),
            (ReasonCode::CLEANUP_FAILURE, "Error on graceful exit process"),
            (ReasonCode::QUIT, "Programmatically quitting"),
        ]
        .into_iter()
        .map(|(code, description)| (code, Arc::from(description)))
        .collect();

        Self { descriptions }
    }

    /// Merges the given custom descriptions into this table, overriding the
    /// descriptions of codes present in both.
    pub fn merge<C, D>(&mut self, custom: impl IntoIterator<Item = (C, D)>)
    where
        C: Into<ReasonCode>,
        D: AsRef<str>,
    {
        for (code, description) in custom {
            self.descriptions
                .insert(code.into(), Arc::from(description.as_ref()));
        }
    }

    /// Same as [`merge`](ReasonTable::merge), but consumes and returns `self`.
    pub fn merged<C, D>(mut self, custom: impl IntoIterator<Item = (C, D)>) -> Self
    where
        C: Into<ReasonCode>,
        D: AsRef<str>,
    {
        self.merge(custom);

        self
    }

    /// Describes the given code, falling back to [`UNKNOWN_REASON`].
    pub fn describe(&self, code: ReasonCode) -> &str {
        self.descriptions
            .get(&code)
            .map(AsRef::as_ref)
            .unwrap_or(UNKNOWN_REASON)
    }

    /// Same as [`describe`](ReasonTable::describe), but returns a shared
    /// string that may outlive this table.
    pub(crate) fn describe_shared(&self, code: ReasonCode) -> Arc<str> {
        self.descriptions
            .get(&code)
            .cloned()
            .unwrap_or_else(|| Arc::from(UNKNOWN_REASON))
    }

    /// Reports whether the given code has a description of its own.
    pub fn contains(&self, code: ReasonCode) -> bool {
        self.descriptions.contains_key(&code)
    }

    /// Iterates over all known codes and their descriptions.
    pub fn iter(&self) -> impl Iterator<Item = (ReasonCode, &str)> {
        self.descriptions
            .iter()
            .map(|(code, description)| (*code, description.as_ref()))
    }
}

impl Default for ReasonTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl<'de> Deserialize<'de> for ReasonCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ReasonCodeVisitor)
    }
}

/// Accepts reason codes both as integers and as integer strings: map keys in
/// most configuration formats arrive as strings.
struct ReasonCodeVisitor;

impl<'de> Visitor<'de> for ReasonCodeVisitor {
    type Value = ReasonCode;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("an integer reason code or a string holding one")
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        i32::try_from(value)
            .map(ReasonCode)
            .map_err(|_| E::custom(format!("reason code {} is out of range", value)))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        i32::try_from(value)
            .map(ReasonCode)
            .map_err(|_| E::custom(format!("reason code {} is out of range", value)))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        value
            .trim()
            .parse::<i32>()
            .map(ReasonCode)
            .map_err(|_| E::custom(format!("'{}' is not a valid reason code", value)))
    }
}

impl<'de> Deserialize<'de> for ReasonTable {
    /// Deserializes only the custom entries: the built-in codes are always
    /// present underneath.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ReasonTableVisitor)
    }
}

struct ReasonTableVisitor;

impl<'de> Visitor<'de> for ReasonTableVisitor {
    type Value = ReasonTable;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a map of reason codes to their descriptions")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut table = ReasonTable::builtin();

        while let Some((code, description)) = map.next_entry::<ReasonCode, String>()? {
            table.descriptions.insert(code, Arc::from(description));
        }

        Ok(table)
    }
}
