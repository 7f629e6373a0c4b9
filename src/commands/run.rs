//! Coordinator run (default mode).
//!
//! Generates one input file per worker, installs the notification handlers,
//! spawns the workers and reaps them in spawn order.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use herakles_memwatch::cli::LogLevel;
use herakles_memwatch::config::Config;
use herakles_memwatch::coordinator::{WorkerCoordinator, WORKER_COUNT};
use herakles_memwatch::event_log::EventLog;
use herakles_memwatch::generate::{generate_binary_file, worker_file_name};
use herakles_memwatch::worker::WorkerLauncher;

/// Runs the coordinator until every worker has exited.
pub fn command_run(config: &Config, log_level: LogLevel) -> Result<(), Box<dyn std::error::Error>> {
    let sizes = match &config.file_sizes_mb {
        Some(sizes) => sizes.clone(),
        None => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            prompt_file_sizes(stdin.lock(), stdout.lock())?
        }
    };

    let work_dir = config.work_dir();
    let files: Vec<PathBuf> = (1..=WORKER_COUNT)
        .map(|i| work_dir.join(worker_file_name(i)))
        .collect();

    for (file, size_mb) in files.iter().zip(&sizes) {
        debug!("Generating {} ({} MB)", file.display(), size_mb);
        generate_binary_file(file, *size_mb)?;
    }
    println!("Binary files created.");

    let launcher = WorkerLauncher::current_exe()?
        .with_threshold_kb(config.threshold_kb())
        .with_buffer_mb(config.buffer_mb())
        .with_log_level(log_level.as_str());

    let mut coordinator = WorkerCoordinator::new(launcher, EventLog::new(config.log_file()));
    coordinator.register_handlers()?;

    for file in &files {
        coordinator.spawn_worker(file)?;
    }

    info!(
        "Coordinator {} waiting for {} workers",
        coordinator.pid(),
        coordinator.outstanding().len()
    );
    for exit in coordinator.await_all() {
        if exit.reason.is_success() {
            debug!("Worker {} reaped: {}", exit.pid, exit.reason);
        } else {
            warn!("Worker {} ({}) {}", exit.pid, exit.file.display(), exit.reason);
        }
    }
    info!("All workers finished");

    Ok(())
}

/// Asks for one file size per worker. Non-numeric lines re-prompt; running out
/// of input is an error.
pub fn prompt_file_sizes<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<Vec<u64>> {
    let mut sizes = Vec::with_capacity(WORKER_COUNT);
    let mut line = String::new();

    for worker in 1..=WORKER_COUNT {
        loop {
            write!(output, "Enter file size for Worker {} (MB): ", worker)?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("no file size given for Worker {}", worker),
                ));
            }

            match line.trim().parse::<u64>() {
                Ok(size) => {
                    sizes.push(size);
                    break;
                }
                Err(_) => writeln!(output, "Invalid size '{}', enter a whole number of MB.", line.trim())?,
            }
        }
    }

    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_reads_three_sizes() {
        let mut out = Vec::new();
        let sizes = prompt_file_sizes("10\n100\n500\n".as_bytes(), &mut out).unwrap();
        assert_eq!(sizes, vec![10, 100, 500]);

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Enter file size for Worker 1 (MB): "));
        assert!(shown.contains("Enter file size for Worker 3 (MB): "));
    }

    #[test]
    fn test_prompt_retries_bad_input() {
        let mut out = Vec::new();
        let sizes = prompt_file_sizes("ten\n-1\n1\n 2 \n0\n".as_bytes(), &mut out).unwrap();
        assert_eq!(sizes, vec![1, 2, 0]);

        let shown = String::from_utf8(out).unwrap();
        assert_eq!(shown.matches("Enter file size for Worker 1 (MB): ").count(), 3);
        assert!(shown.contains("Invalid size 'ten'"));
    }

    #[test]
    fn test_prompt_eof_is_error() {
        let err = prompt_file_sizes("5\n".as_bytes(), io::sink()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(err.to_string().contains("Worker 2"));
    }
}
