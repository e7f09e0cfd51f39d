//! User-facing notification channel.
//!
//! Every user-relevant state change in the session (admission, progress,
//! pause/resume, cancel, completion, errors) goes through a [`Notifier`].
//! Notices are always mirrored into the tracing log; a front end that wants
//! to render them subscribes to the channel side. `Log`-severity notices are
//! forwarded to subscribers only when verbose logging is on.

use tokio::sync::mpsc;

/// How a notice should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Diagnostic detail; suppressed for subscribers unless verbose.
    Log,
    /// State change the user should see.
    Status,
    /// Failure the user should see.
    Error,
}

/// One rendered message plus its severity.
#[derive(Debug, Clone)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

/// Cloneable producer half of the notification channel.
#[derive(Clone)]
pub struct Notifier {
    verbose: bool,
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl Notifier {
    /// A notifier that only mirrors into tracing (no subscriber).
    pub fn new(verbose: bool) -> Self {
        Self { verbose, tx: None }
    }

    /// A notifier plus the receiver a front end drains for display.
    pub fn with_subscriber(verbose: bool) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                verbose,
                tx: Some(tx),
            },
            rx,
        )
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(Severity::Log, message.into());
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(Severity::Status, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Severity::Error, message.into());
    }

    fn emit(&self, severity: Severity, message: String) {
        match severity {
            Severity::Log => tracing::debug!("{}", message),
            Severity::Status => tracing::info!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
        if severity == Severity::Log && !self.verbose {
            return;
        }
        if let Some(tx) = &self.tx {
            // A dropped receiver just means nobody is rendering anymore.
            let _ = tx.send(Notice { severity, message });
        }
    }
}
