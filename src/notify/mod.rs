//! Worker-to-coordinator notifications.
//!
//! A notification is one of two kinds, delivered as a POSIX signal to the
//! coordinator. Delivery is fire-and-forget: the sender never learns whether
//! the handler ran, and the kernel may merge two pending signals of the same
//! kind into one.
//!
//! - `MemoryExceeded` -> `SIGUSR1`
//! - `Completed` -> `SIGUSR2`

pub mod handler;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fmt;

use crate::event_log::StackBuf;

pub use handler::{dispatch, register_handlers, HandlerContext, HandlerError};

/// Capacity of a formatted notification message.
pub const MESSAGE_CAPACITY: usize = 100;

/// The two things a worker can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    MemoryExceeded,
    Completed,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 2] = [Self::MemoryExceeded, Self::Completed];

    /// Signal carrying this kind.
    pub fn signal(self) -> Signal {
        match self {
            Self::MemoryExceeded => Signal::SIGUSR1,
            Self::Completed => Signal::SIGUSR2,
        }
    }

    /// Maps a raw signal number back to a kind.
    pub fn from_signal(signum: libc::c_int) -> Option<Self> {
        match signum {
            libc::SIGUSR1 => Some(Self::MemoryExceeded),
            libc::SIGUSR2 => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MemoryExceeded => "memory_exceeded",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A received notification: its kind and the sending worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    MemoryExceeded(Pid),
    Completed(Pid),
}

impl Notification {
    pub fn new(kind: NotificationKind, sender: Pid) -> Self {
        match kind {
            NotificationKind::MemoryExceeded => Self::MemoryExceeded(sender),
            NotificationKind::Completed => Self::Completed(sender),
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::MemoryExceeded(_) => NotificationKind::MemoryExceeded,
            Self::Completed(_) => NotificationKind::Completed,
        }
    }

    pub fn sender(&self) -> Pid {
        match *self {
            Self::MemoryExceeded(pid) | Self::Completed(pid) => pid,
        }
    }

    /// Formats the console/log message without heap allocation.
    pub fn message(&self) -> StackBuf<MESSAGE_CAPACITY> {
        let mut buf = StackBuf::new();
        let _ = fmt::Write::write_fmt(&mut buf, format_args!("{}", self));
        buf
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemoryExceeded(pid) => write!(f, "⚠️ Worker (PID: {}) exceeded memory limit!", pid),
            Self::Completed(pid) => write!(f, "✅ Worker (PID: {}) completed.", pid),
        }
    }
}

/// Errors raised while sending a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to send {kind} notification to PID {target}: {source}")]
    Send {
        kind: NotificationKind,
        target: Pid,
        #[source]
        source: nix::Error,
    },
}

/// Sending side of the notification channel.
pub trait Notifier {
    fn notify(&self, kind: NotificationKind) -> Result<(), NotifyError>;
}

/// Delivers notifications to a target process with `kill(2)`.
#[derive(Debug, Clone, Copy)]
pub struct SignalNotifier {
    target: Pid,
}

impl SignalNotifier {
    pub fn new(target: Pid) -> Self {
        Self { target }
    }

    pub fn target(&self) -> Pid {
        self.target
    }
}

impl Notifier for SignalNotifier {
    fn notify(&self, kind: NotificationKind) -> Result<(), NotifyError> {
        kill(self.target, kind.signal()).map_err(|source| NotifyError::Send {
            kind,
            target: self.target,
            source,
        })
    }
}
