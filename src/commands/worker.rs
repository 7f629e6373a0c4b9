//! Worker command implementation.
//!
//! Entry point of a spawned worker process. Never returns.

use nix::unistd::Pid;
use std::path::Path;

use herakles_memwatch::worker::run_worker_process;

/// Runs the worker task and exits with its status.
pub fn command_worker(file: &Path, target_pid: i32, threshold_kb: u64, buffer_mb: usize) -> ! {
    let code = run_worker_process(file, Pid::from_raw(target_pid), threshold_kb, buffer_mb);
    std::process::exit(code)
}
