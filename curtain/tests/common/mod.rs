#![allow(dead_code)]

use curtain::{LogSink, ReasonCode, Terminator};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

/// A [`LogSink`] that remembers every message.
#[derive(Clone, Default)]
pub struct Journal {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }
}

impl LogSink for Journal {
    fn log(&self, message: &str) {
        self.lines.lock().push(message.to_string());
    }
}

/// A [`Terminator`] that publishes the exit code instead of exiting.
#[derive(Clone)]
pub struct ExitProbe {
    sender: Arc<watch::Sender<Option<ReasonCode>>>,
}

impl ExitProbe {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);

        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn code(&self) -> Option<ReasonCode> {
        *self.sender.borrow()
    }

    pub async fn exited(&self) -> ReasonCode {
        let mut receiver = self.sender.subscribe();
        let code: Option<ReasonCode> = *receiver
            .wait_for(Option::is_some)
            .await
            .expect("sender is owned by self");

        code.expect("checked above")
    }
}

impl Terminator for ExitProbe {
    fn terminate(&self, code: ReasonCode) {
        self.sender.send_replace(Some(code));
    }
}
