//! Shared append-only event log with cross-process locking.
//!
//! Every line is `[YYYY-MM-DD HH:MM:SS] <message>`. Appends take an exclusive
//! POSIX record lock over the whole file, so lines written by different
//! processes never interleave.
//!
//! `append` is called from signal handler context. It therefore formats into
//! fixed-size stack buffers, never touches the time-zone database, and gives
//! up on the lock after a bounded number of attempts.

use chrono::{DateTime, Datelike, Local, Timelike, Utc};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log file name, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "syslog.log";

/// Maximum length of one log line including the trailing newline.
pub const LINE_CAPACITY: usize = 256;

/// Lock attempts before an append is dropped.
pub const LOCK_ATTEMPTS: u32 = 50;

/// Pause between lock attempts.
pub const LOCK_RETRY_DELAY: Duration = Duration::from_millis(2);

/// Errors from a single append. None of them are fatal to the caller.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Log file open failed: {0}")]
    Open(#[source] io::Error),

    #[error("File lock failed: {0}")]
    Lock(#[source] Errno),

    #[error("Log write failed: {0}")]
    Write(#[source] io::Error),
}

/// Fixed-capacity, stack-allocated text buffer.
///
/// Writes past the capacity are truncated at a UTF-8 character boundary and
/// reported as `fmt::Error`, which stops the surrounding `write!`.
pub struct StackBuf<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> StackBuf<N> {
    pub const fn new() -> Self {
        Self { buf: [0; N], len: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn as_str(&self) -> &str {
        // Only whole characters are ever copied in.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Terminates the buffer with `\n`, dropping trailing characters if full.
    pub fn end_line(&mut self) {
        if N == 0 {
            return;
        }
        if self.len == N {
            let mut cut = N - 1;
            while cut > 0 && is_continuation(self.buf[cut]) {
                cut -= 1;
            }
            self.len = cut;
        }
        self.buf[self.len] = b'\n';
        self.len += 1;
    }
}

impl<const N: usize> Default for StackBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Write for StackBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = N - self.len;
        if s.len() <= room {
            self.buf[self.len..self.len + s.len()].copy_from_slice(s.as_bytes());
            self.len += s.len();
            return Ok(());
        }

        let mut take = room;
        while take > 0 && !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Err(fmt::Error)
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

/// Writes `YYYY-MM-DD HH:MM:SS` for the given epoch seconds shifted by a fixed offset.
pub fn write_timestamp(out: &mut impl fmt::Write, epoch_secs: i64, utc_offset_secs: i32) -> fmt::Result {
    match DateTime::<Utc>::from_timestamp(epoch_secs + i64::from(utc_offset_secs), 0) {
        Some(t) => write!(
            out,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            t.year(),
            t.month(),
            t.day(),
            t.hour(),
            t.minute(),
            t.second()
        ),
        None => out.write_str("0000-00-00 00:00:00"),
    }
}

/// Handle to the shared log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLog {
    path: PathBuf,
    utc_offset_secs: i32,
    lock_attempts: u32,
    lock_retry_delay: Duration,
}

impl EventLog {
    /// Creates a handle for `path`. The local UTC offset is captured here,
    /// outside any signal handler.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            utc_offset_secs: Local::now().offset().local_minus_utc(),
            lock_attempts: LOCK_ATTEMPTS,
            lock_retry_delay: LOCK_RETRY_DELAY,
        }
    }

    /// Overrides the captured UTC offset.
    pub fn with_utc_offset(mut self, utc_offset_secs: i32) -> Self {
        self.utc_offset_secs = utc_offset_secs;
        self
    }

    /// Overrides how long `append` keeps retrying a contended lock.
    pub fn with_lock_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.lock_attempts = attempts.max(1);
        self.lock_retry_delay = delay;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Builds the full line, newline included, for `message` at `epoch_secs`.
    pub fn format_line(&self, message: &str, epoch_secs: i64) -> StackBuf<LINE_CAPACITY> {
        let mut line = StackBuf::new();
        // Overflow only truncates the line.
        let _ = self.write_entry(&mut line, message, epoch_secs);
        line.end_line();
        line
    }

    fn write_entry(&self, out: &mut impl fmt::Write, message: &str, epoch_secs: i64) -> fmt::Result {
        out.write_char('[')?;
        write_timestamp(out, epoch_secs, self.utc_offset_secs)?;
        out.write_str("] ")?;
        out.write_str(message)
    }

    /// Appends one timestamped line under the cross-process lock.
    pub fn append(&self, message: &str) -> Result<(), LogError> {
        let file = self.open()?;
        let _lock = RecordLock::acquire(&file, self.lock_attempts, self.lock_retry_delay)?;

        let line = self.format_line(message, Utc::now().timestamp());
        (&file).write_all(line.as_bytes()).map_err(LogError::Write)
    }

    /// Opens and locks the log without writing anything.
    pub fn probe_writable(&self) -> Result<(), LogError> {
        let file = self.open()?;
        RecordLock::acquire(&file, self.lock_attempts, self.lock_retry_delay).map(drop)
    }

    fn open(&self) -> Result<File, LogError> {
        OpenOptions::new()
            .append(true)
            .create(true)
            .mode(0o644)
            .open(&self.path)
            .map_err(LogError::Open)
    }
}

/// Exclusive whole-file `fcntl` lock, released on drop.
struct RecordLock<'a> {
    file: &'a File,
}

impl<'a> RecordLock<'a> {
    fn acquire(file: &'a File, attempts: u32, delay: Duration) -> Result<Self, LogError> {
        let request = whole_file(libc::F_WRLCK);
        let mut attempt = 1;
        loop {
            match fcntl(file.as_raw_fd(), FcntlArg::F_SETLK(&request)) {
                Ok(_) => return Ok(Self { file }),
                Err(Errno::EACCES | Errno::EAGAIN | Errno::EINTR) if attempt < attempts => {
                    attempt += 1;
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(LogError::Lock(e)),
            }
        }
    }
}

impl Drop for RecordLock<'_> {
    fn drop(&mut self) {
        let _ = fcntl(self.file.as_raw_fd(), FcntlArg::F_SETLK(&whole_file(libc::F_UNLCK)));
    }
}

fn whole_file(kind: libc::c_int) -> libc::flock {
    // SAFETY: flock is plain old data; all-zero is a valid value (offset 0, length 0 = whole file).
    let mut lock: libc::flock = unsafe { std::mem::zeroed() };
    lock.l_type = kind as libc::c_short;
    lock.l_whence = libc::SEEK_SET as libc::c_short;
    lock
}
