use crate::core::{Notice, Notifier};
use std::sync::{Arc, Mutex};

/// Sends notices to the log, and optionally to stderr for terminal users.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier {
    echo_stderr: bool,
}

impl TracingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stderr() -> Self {
        Self { echo_stderr: true }
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        tracing::warn!("🔔 {}", notice);
        if self.echo_stderr {
            eprintln!("❌ {}", notice);
        }
    }
}

/// Keeps every notice in order. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.notices().is_empty()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(
            &mut *self
                .notices
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notice);
    }
}
