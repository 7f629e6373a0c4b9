//! Child-side worker logic.
//!
//! A worker streams one file in fixed-size chunks into a resident buffer,
//! probes its own RSS after each chunk, reports the first threshold crossing
//! and reports completion once it reaches end-of-file.

use std::collections::TryReserveError;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::notify::{NotificationKind, Notifier};
use crate::process::{MemoryProbe, ProbeError};

/// Bytes read per chunk; every chunk is followed by one memory probe.
pub const CHUNK_SIZE: usize = 4096;

/// RSS (kB) above which a worker reports `MemoryExceeded`.
pub const DEFAULT_THRESHOLD_KB: u64 = 50_000;

/// Size of the buffer each worker keeps resident.
pub const DEFAULT_BUFFER_MB: usize = 50;

const MB: usize = 1024 * 1024;

/// Fatal worker failures. Each maps to its own exit status.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Failed to open file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to allocate memory ({bytes} bytes): {source}")]
    Alloc {
        bytes: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("Failed to query resident memory: {0}")]
    Probe(#[from] ProbeError),

    #[error("Failed to read file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WorkerError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Open { .. } => 2,
            Self::Alloc { .. } => 3,
            Self::Probe(_) => 4,
            Self::Read { .. } => 5,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub bytes_read: u64,
    pub chunks: u64,
    pub peak_rss_kb: u64,
    pub exceeded_notified: bool,
}

/// One worker's state: input file, threshold, and the one-shot exceeded flag.
pub struct WorkerTask<P, N> {
    file_path: PathBuf,
    threshold_kb: u64,
    buffer_bytes: usize,
    probe: P,
    notifier: N,
    exceeded_notified: bool,
}

impl<P: MemoryProbe, N: Notifier> WorkerTask<P, N> {
    pub fn new(file_path: impl Into<PathBuf>, threshold_kb: u64, probe: P, notifier: N) -> Self {
        Self {
            file_path: file_path.into(),
            threshold_kb,
            buffer_bytes: DEFAULT_BUFFER_MB * MB,
            probe,
            notifier,
            exceeded_notified: false,
        }
    }

    /// Sets the resident buffer size in megabytes.
    pub fn with_buffer_mb(self, buffer_mb: usize) -> Self {
        self.with_buffer_bytes(buffer_mb.saturating_mul(MB))
    }

    /// Sets the resident buffer size in bytes (at least one chunk).
    pub fn with_buffer_bytes(mut self, bytes: usize) -> Self {
        self.buffer_bytes = bytes.max(CHUNK_SIZE);
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn exceeded_notified(&self) -> bool {
        self.exceeded_notified
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Streams the file to end-of-file, then sends `Completed`.
    ///
    /// Errors are fatal: no `Completed` notification is sent for a failed run.
    pub fn run(&mut self) -> Result<WorkerReport, WorkerError> {
        let mut file = File::open(&self.file_path).map_err(|source| WorkerError::Open {
            path: self.file_path.clone(),
            source,
        })?;
        let mut buffer = allocate_resident(self.buffer_bytes)?;
        debug!(
            "Worker streaming {} into a {} byte buffer",
            self.file_path.display(),
            buffer.len()
        );

        let mut report = WorkerReport::default();
        let mut offset = 0;
        loop {
            let end = (offset + CHUNK_SIZE).min(buffer.len());
            let n = match file.read(&mut buffer[offset..end]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(WorkerError::Read {
                        path: self.file_path.clone(),
                        source,
                    })
                }
            };
            offset = if offset + n == buffer.len() { 0 } else { offset + n };
            report.bytes_read += n as u64;
            report.chunks += 1;

            let rss_kb = self.probe.resident_kb()?;
            report.peak_rss_kb = report.peak_rss_kb.max(rss_kb);
            self.check_threshold(rss_kb);
        }

        drop(buffer);
        drop(file);

        self.send(NotificationKind::Completed);
        report.exceeded_notified = self.exceeded_notified;
        Ok(report)
    }

    fn check_threshold(&mut self, rss_kb: u64) {
        if rss_kb > self.threshold_kb && !self.exceeded_notified {
            debug!(
                "Resident memory {} kB above threshold {} kB",
                rss_kb, self.threshold_kb
            );
            self.send(NotificationKind::MemoryExceeded);
            self.exceeded_notified = true;
        }
    }

    fn send(&self, kind: NotificationKind) {
        if let Err(e) = self.notifier.notify(kind) {
            warn!("{}", e);
        }
    }
}

/// Allocates `bytes` and writes every byte so the pages count towards RSS.
fn allocate_resident(bytes: usize) -> Result<Vec<u8>, WorkerError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes)
        .map_err(|source| WorkerError::Alloc { bytes, source })?;
    // Non-zero fill so every page is written, not just mapped.
    buffer.resize(bytes, 1);
    Ok(buffer)
}
