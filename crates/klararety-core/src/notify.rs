//! User-visible notifications and navigation.
//!
//! The library never renders anything itself. Whatever hosts it (a terminal,
//! a desktop shell, a test) supplies a [`Notifier`] for transient messages and
//! a [`Navigator`] for redirects.

use std::fmt;

use crate::TRACING_TARGET_NOTIFY;

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Surfaces transient messages to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Moves the user to another location of the application.
pub trait Navigator: Send + Sync {
    /// Navigates to `location`, a path with an optional query string.
    fn navigate(&self, location: &str);
}

/// [`Notifier`] that writes notices to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(target: TRACING_TARGET_NOTIFY, message = %notice.message, "notice");
            }
            NoticeLevel::Warning => {
                tracing::warn!(target: TRACING_TARGET_NOTIFY, message = %notice.message, "notice");
            }
            NoticeLevel::Error => {
                tracing::error!(target: TRACING_TARGET_NOTIFY, message = %notice.message, "notice");
            }
        }
    }
}

/// [`Navigator`] that only records the redirect in the trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, location: &str) {
        tracing::info!(target: TRACING_TARGET_NOTIFY, location, "navigate");
    }
}
