//! User-facing notification sink.
//!
//! The loan manager reports the outcome of every operation through a
//! [`Notifier`]. Notifications are fire-and-forget: an implementation must
//! not block, and swapping in [`NoopNotifier`] never changes behavior.

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyLevel {
    /// Neutral information.
    Info,
    /// An operation completed.
    Success,
    /// Nothing was done, but nothing failed either.
    Warning,
    /// An operation failed.
    Error,
}

impl core::fmt::Display for NotifyLevel {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match *self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Receives user-facing messages.
pub trait Notifier: core::fmt::Debug + Send + Sync {
    /// Delivers one message.
    fn notify(&self, message: &str, level: NotifyLevel);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    #[inline]
    fn notify(&self, _message: &str, _level: NotifyLevel) {}
}

/// Forwards notifications to `tracing` events.
///
/// `Info` and `Success` map to `INFO`, `Warning` to `WARN` and `Error` to
/// `ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    #[inline]
    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Info | NotifyLevel::Success => {
                tracing::info!(%level, "{message}");
            }
            NotifyLevel::Warning => tracing::warn!(%level, "{message}"),
            NotifyLevel::Error => tracing::error!(%level, "{message}"),
        }
    }
}
