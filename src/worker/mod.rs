//! Worker processes: the streaming task, how it is spawned, and how it ends.
//!
//! - `task`: chunked read loop with the one-shot threshold notification
//! - `spawn`: re-executing this binary in worker mode
//! - `exit`: termination reasons for reaped workers

pub mod exit;
pub mod spawn;
pub mod task;

pub use exit::{analyze_wait_status, TerminationReason};
pub use spawn::{WorkerLauncher, WORKER_SUBCOMMAND};
pub use task::{
    WorkerError, WorkerReport, WorkerTask, CHUNK_SIZE, DEFAULT_BUFFER_MB, DEFAULT_THRESHOLD_KB,
};

use nix::unistd::Pid;
use std::path::Path;
use tracing::{debug, info};

use crate::notify::SignalNotifier;
use crate::process::ProcStatusProbe;

/// Runs a worker in the current process and returns its exit status.
///
/// Fatal errors print a diagnostic to stderr. No `Completed` notification is
/// sent in that case.
pub fn run_worker_process(file: &Path, target: Pid, threshold_kb: u64, buffer_mb: usize) -> i32 {
    info!(
        "Worker {} started on {} (target PID {})",
        Pid::this(),
        file.display(),
        target
    );

    let mut task = WorkerTask::new(
        file,
        threshold_kb,
        ProcStatusProbe::current(),
        SignalNotifier::new(target),
    )
    .with_buffer_mb(buffer_mb);

    match task.run() {
        Ok(report) => {
            debug!(
                "Worker {} done: {} bytes in {} chunks, peak RSS {} kB, exceeded={}",
                Pid::this(),
                report.bytes_read,
                report.chunks,
                report.peak_rss_kb,
                report.exceeded_notified
            );
            0
        }
        Err(e) => {
            eprintln!("❌ Worker (PID: {}): {}", Pid::this(), e);
            e.exit_code()
        }
    }
}
