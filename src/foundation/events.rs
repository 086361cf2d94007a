//! Observer port for notices raised by the timeline, easing lookups, and exports.

use std::sync::Mutex;

use crate::foundation::error::ErrorCategory;

/// Notice severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Diagnostic detail.
    Debug,
    /// Noteworthy but expected.
    Info,
    /// Degraded behavior the host should surface.
    Warning,
    /// A failure.
    Error,
}

/// A host-visible notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// How loud to be.
    pub severity: Severity,
    /// What kind of problem.
    pub category: ErrorCategory,
    /// Human-readable text.
    pub message: String,
}

impl Notice {
    /// Create a notice.
    pub fn new(severity: Severity, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
        }
    }
}

/// Receives notices. Injected wherever something needs to report without failing.
pub trait EventSink: Send + Sync {
    /// Deliver one notice.
    fn notify(&self, notice: Notice);
}

/// Forwards notices to `tracing` at the matching level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn notify(&self, notice: Notice) {
        let category = notice.category.as_str();
        match notice.severity {
            Severity::Debug => tracing::debug!(category, "{}", notice.message),
            Severity::Info => tracing::info!(category, "{}", notice.message),
            Severity::Warning => tracing::warn!(category, "{}", notice.message),
            Severity::Error => tracing::error!(category, "{}", notice.message),
        }
    }
}

/// Collects notices in arrival order.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// Notices at or above `min`.
    pub fn at_least(&self, min: Severity) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|n| n.severity >= min)
            .collect()
    }
}

impl EventSink for NoticeLog {
    fn notify(&self, notice: Notice) {
        if let Ok(mut n) = self.notices.lock() {
            n.push(notice);
        }
    }
}
