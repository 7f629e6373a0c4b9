//! Worker subprocess spawning.
//!
//! Workers are this same executable re-run with the hidden `worker`
//! subcommand. The coordinator's PID travels on the command line, so a
//! worker never has to guess where to send notifications.

use nix::unistd::Pid;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use super::task::{DEFAULT_BUFFER_MB, DEFAULT_THRESHOLD_KB};

/// Subcommand name the worker mode is registered under.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Builds and starts worker processes.
#[derive(Debug, Clone)]
pub struct WorkerLauncher {
    program: PathBuf,
    threshold_kb: u64,
    buffer_mb: usize,
    log_level: Option<String>,
}

impl WorkerLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            threshold_kb: DEFAULT_THRESHOLD_KB,
            buffer_mb: DEFAULT_BUFFER_MB,
            log_level: None,
        }
    }

    /// Launcher that re-executes the running binary.
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn with_threshold_kb(mut self, threshold_kb: u64) -> Self {
        self.threshold_kb = threshold_kb;
        self
    }

    pub fn with_buffer_mb(mut self, buffer_mb: usize) -> Self {
        self.buffer_mb = buffer_mb;
        self
    }

    /// Passes `--log-level` through to workers.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn threshold_kb(&self) -> u64 {
        self.threshold_kb
    }

    /// Arguments for one worker bound to `file` and reporting to `target`.
    pub fn args(&self, file: &Path, target: Pid) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(12);
        if let Some(level) = &self.log_level {
            args.push("--log-level".into());
            args.push(level.into());
        }
        args.push(WORKER_SUBCOMMAND.into());
        args.push("--file".into());
        args.push(file.as_os_str().to_owned());
        args.push("--target-pid".into());
        args.push(target.to_string().into());
        args.push("--threshold-kb".into());
        args.push(self.threshold_kb.to_string().into());
        args.push("--buffer-mb".into());
        args.push(self.buffer_mb.to_string().into());
        args
    }

    /// Starts one worker. Stdout and stderr are shared with the coordinator.
    pub fn spawn(&self, file: &Path, target: Pid) -> io::Result<Child> {
        Command::new(&self.program)
            .args(self.args(file, target))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_carry_target_and_settings() {
        let launcher = WorkerLauncher::new("/usr/bin/memwatch")
            .with_threshold_kb(1234)
            .with_buffer_mb(8)
            .with_log_level("debug");

        let args = launcher.args(Path::new("worker1.bin"), Pid::from_raw(321));
        let args: Vec<String> = args.into_iter().map(|a| a.into_string().unwrap()).collect();

        assert_eq!(
            args,
            vec![
                "--log-level",
                "debug",
                "worker",
                "--file",
                "worker1.bin",
                "--target-pid",
                "321",
                "--threshold-kb",
                "1234",
                "--buffer-mb",
                "8",
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let launcher = WorkerLauncher::new("x");
        assert_eq!(launcher.program(), Path::new("x"));
        assert_eq!(launcher.threshold_kb(), DEFAULT_THRESHOLD_KB);
        let args = launcher.args(Path::new("f"), Pid::from_raw(1));
        assert_eq!(args[0], OsString::from("worker"));
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        let launcher = WorkerLauncher::new("/nonexistent/herakles-memwatch");
        assert!(launcher
            .spawn(Path::new("worker1.bin"), Pid::this())
            .is_err());
    }
}
