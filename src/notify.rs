//! User-visible signals.
//!
//! Tasks report progress and terminal status through a [`SignalSink`]. Sinks
//! are fire-and-forget: `emit` returns nothing and must not block.

use std::sync::Arc;

use tokio::sync::mpsc;

/// Kind of a user-visible signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Info,
    Error,
    Succeed,
}

/// One message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub text: String,
    pub kind: SignalKind,
}

impl Signal {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SignalKind::Info,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SignalKind::Error,
        }
    }

    pub fn succeed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SignalKind::Succeed,
        }
    }
}

/// Destination for [`Signal`]s.
pub trait SignalSink: Send + Sync {
    fn emit(&self, signal: Signal);
}

/// Shared handle type used by tasks.
pub type SharedSink = Arc<dyn SignalSink>;

// ---------------------------------------------------------------------------
// LogSink
// ---------------------------------------------------------------------------

/// Writes signals to the `log` facade under a fixed job label.
#[derive(Debug, Clone)]
pub struct LogSink {
    label: String,
}

impl LogSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl SignalSink for LogSink {
    fn emit(&self, signal: Signal) {
        match signal.kind {
            SignalKind::Info => log::info!("[{}] {}", self.label, signal.text),
            SignalKind::Succeed => log::info!("[{}] succeeded: {}", self.label, signal.text),
            SignalKind::Error => log::error!("[{}] {}", self.label, signal.text),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelSink
// ---------------------------------------------------------------------------

/// Forwards signals over an unbounded tokio channel, e.g. to a UI loop.
///
/// A closed receiver is not an error; signals are simply dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Signal>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SignalSink for ChannelSink {
    fn emit(&self, signal: Signal) {
        let _ = self.tx.send(signal);
    }
}

// ---------------------------------------------------------------------------
// RecordingSink  (test-only)
// ---------------------------------------------------------------------------

/// Keeps every signal in memory so tests can assert on them.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    signals: std::sync::Mutex<Vec<Signal>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<SignalKind> {
        self.signals().iter().map(|s| s.kind).collect()
    }
}

#[cfg(test)]
impl SignalSink for RecordingSink {
    fn emit(&self, signal: Signal) {
        self.signals.lock().unwrap().push(signal);
    }
}
