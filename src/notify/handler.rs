//! Coordinator-side notification handler.
//!
//! The handler runs in signal context and may interrupt any coordinator code,
//! including a blocked `waitpid`. It only formats into stack buffers, appends
//! through `EventLog` (whose lock wait is bounded) and writes to the console
//! with raw `write(2)`. It never logs through tracing and never takes the
//! stdout lock.

use nix::errno::Errno;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet};
use nix::unistd::Pid;
use once_cell::sync::OnceCell;
use std::os::unix::io::{BorrowedFd, RawFd};
use std::path::PathBuf;

use super::{Notification, NotificationKind, MESSAGE_CAPACITY};
use crate::event_log::{EventLog, StackBuf};

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Notification handlers already log to {}", .0.display())]
    AlreadyRegistered(PathBuf),

    #[error("sigaction failed: {0}")]
    Install(#[source] Errno),
}

/// Everything the handler needs, fixed at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerContext {
    pub log: EventLog,
    pub console_fd: RawFd,
}

impl HandlerContext {
    /// Context that echoes notifications to the process's stdout.
    pub fn stdout(log: EventLog) -> Self {
        Self {
            log,
            console_fd: libc::STDOUT_FILENO,
        }
    }
}

static CONTEXT: OnceCell<HandlerContext> = OnceCell::new();
static INSTALLED: OnceCell<()> = OnceCell::new();

/// Installs the notification handler for both kinds.
///
/// The context is process-wide. Registering the same context again is a
/// no-op; a different one is rejected with `AlreadyRegistered`. Both signals
/// are blocked while the handler runs, so invocations never nest.
pub fn register_handlers(context: HandlerContext) -> Result<(), HandlerError> {
    if let Err(rejected) = CONTEXT.set(context) {
        if let Some(current) = CONTEXT.get().filter(|current| **current != rejected) {
            return Err(HandlerError::AlreadyRegistered(current.log.path().to_path_buf()));
        }
    }

    INSTALLED
        .get_or_try_init(|| {
            let mut mask = SigSet::empty();
            for kind in NotificationKind::ALL {
                mask.add(kind.signal());
            }
            let action = SigAction::new(
                SigHandler::SigAction(on_notification),
                SaFlags::SA_SIGINFO | SaFlags::SA_RESTART,
                mask,
            );

            for kind in NotificationKind::ALL {
                // SAFETY: on_notification only calls async-signal-safe operations
                // and reads CONTEXT, which is fully initialised before this point.
                unsafe { sigaction(kind.signal(), &action) }.map_err(HandlerError::Install)?;
            }
            Ok(())
        })
        .map(|_| ())
}

/// Whether `register_handlers` has completed in this process.
pub fn handlers_installed() -> bool {
    INSTALLED.get().is_some()
}

/// Records one notification: log append, then console echo.
///
/// Log failures are dropped; the console line is written regardless.
pub fn dispatch(notification: Notification, log: &EventLog, console_fd: RawFd) {
    let message = notification.message();
    let _ = log.append(message.as_str());

    let mut line: StackBuf<{ MESSAGE_CAPACITY + 1 }> = StackBuf::new();
    let _ = std::fmt::Write::write_str(&mut line, message.as_str());
    line.end_line();
    write_all_raw(console_fd, line.as_bytes());
}

fn write_all_raw(fd: RawFd, mut bytes: &[u8]) {
    // SAFETY: the descriptor is owned by the process for its whole lifetime
    // (stdout, or a file the caller keeps open).
    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
    while !bytes.is_empty() {
        match nix::unistd::write(fd, bytes) {
            Ok(0) => return,
            Ok(n) => bytes = &bytes[n..],
            Err(Errno::EINTR) => continue,
            Err(_) => return,
        }
    }
}

extern "C" fn on_notification(
    signum: libc::c_int,
    info: *mut libc::siginfo_t,
    _ucontext: *mut libc::c_void,
) {
    let saved_errno = Errno::last_raw();

    if let (Some(kind), Some(context)) = (NotificationKind::from_signal(signum), CONTEXT.get()) {
        // SAFETY: with SA_SIGINFO the kernel passes a valid siginfo_t.
        let sender = unsafe { info.as_ref().map_or(0, |info| info.si_pid()) };
        dispatch(
            Notification::new(kind, Pid::from_raw(sender)),
            &context.log,
            context.console_fd,
        );
    }

    Errno::set_raw(saved_errno);
}
