use crate::sink::LogSink;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A [`LogSink`] that forwards every message to `tracing`, tagged with a
/// `label` field.
///
/// Plain [`log`](LogSink::log) calls become `DEBUG` events, so they only show
/// up when the subscriber is verbose enough.
#[derive(Debug, Clone)]
pub struct LabelSink {
    label: Arc<str>,
}

impl LabelSink {
    /// Creates a sink tagging all events with the given label.
    pub fn new(label: impl AsRef<str>) -> Self {
        Self {
            label: Arc::from(label.as_ref()),
        }
    }

    /// Exposes the label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl LogSink for LabelSink {
    fn log(&self, message: &str) {
        debug!(label = self.label.as_ref(), "{}", message);
    }

    fn info(&self, message: &str) {
        info!(label = self.label.as_ref(), "{}", message);
    }

    fn error(&self, message: &str) {
        error!(label = self.label.as_ref(), "{}", message);
    }
}
