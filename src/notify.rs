use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

/// How long a toast stays fully visible.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);
/// Fade-out delay between hiding a toast and signalling dismissal.
pub const FADE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    #[serde(skip)]
    pub duration: Duration,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            duration: DEFAULT_DURATION,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Time from `show` until the dismiss signal fires.
    pub fn dismiss_after(&self) -> Duration {
        self.duration + FADE_DELAY
    }
}

/// Sink for user-facing notifications. Showing never fails the caller.
pub trait Notifier {
    fn show(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn show(&self, notification: Notification) {
        (**self).show(notification)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    Visible,
    Fading,
    Dismissed,
}

/// One on-screen notification and its timer.
#[derive(Debug, Clone)]
pub struct Toast {
    pub notification: Notification,
}

impl Toast {
    pub fn new(notification: Notification) -> Self {
        Self { notification }
    }

    pub fn phase(&self, elapsed: Duration) -> ToastPhase {
        if elapsed < self.notification.duration {
            ToastPhase::Visible
        } else if elapsed < self.notification.dismiss_after() {
            ToastPhase::Fading
        } else {
            ToastPhase::Dismissed
        }
    }

    pub fn is_visible(&self, elapsed: Duration) -> bool {
        self.phase(elapsed) == ToastPhase::Visible
    }
}

/// Prints notifications to stderr, coloured by severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier {
    /// Print nothing, e.g. when stderr carries machine-readable errors.
    pub quiet: bool,
    /// Leave errors to whoever receives the returned `TickError`.
    pub skip_errors: bool,
}

impl Notifier for TerminalNotifier {
    fn show(&self, notification: Notification) {
        if self.quiet || (self.skip_errors && notification.severity == Severity::Error) {
            return;
        }
        let line = match notification.severity {
            Severity::Success => notification.message.green(),
            Severity::Error => notification.message.red(),
            Severity::Info => notification.message.blue(),
        };
        eprintln!("{line}");
    }
}

/// Keeps every notification, newest last.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    shown: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.borrow().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.shown.borrow().last().cloned()
    }

    pub fn take(&self) -> Vec<Notification> {
        self.shown.take()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, notification: Notification) {
        self.shown.borrow_mut().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_fades_before_dismissal() {
        let toast = Toast::new(Notification::success("Task added successfully!"));

        assert_eq!(toast.phase(Duration::ZERO), ToastPhase::Visible);
        assert_eq!(toast.phase(Duration::from_millis(2999)), ToastPhase::Visible);
        assert_eq!(toast.phase(Duration::from_millis(3000)), ToastPhase::Fading);
        assert_eq!(toast.phase(Duration::from_millis(3299)), ToastPhase::Fading);
        assert_eq!(toast.phase(Duration::from_millis(3300)), ToastPhase::Dismissed);
    }

    #[test]
    fn custom_duration_moves_the_dismiss_deadline() {
        let n = Notification::info("hello").with_duration(Duration::from_millis(500));
        assert_eq!(n.dismiss_after(), Duration::from_millis(800));
        assert!(!Toast::new(n).is_visible(Duration::from_millis(600)));
    }

    #[test]
    fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.show(Notification::error("first"));
        notifier.show(Notification::success("second"));

        let shown = notifier.take();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].severity, Severity::Error);
        assert_eq!(shown[1].message, "second");
        assert!(notifier.last().is_none());
    }
}
