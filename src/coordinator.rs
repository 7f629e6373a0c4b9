//! Parent-side orchestration.
//!
//! The coordinator registers the notification handler, spawns workers bound
//! to its own PID, then blocks on each worker in spawn order. Notifications
//! are a side channel: reaping waits on process termination only, so a worker
//! that dies without reporting still unblocks `await_all`.
//!
//! The handler may run interleaved with any coordinator code, including in the
//! middle of `await_all`.

use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::event_log::EventLog;
use crate::notify::{self, HandlerContext, HandlerError};
use crate::worker::{analyze_wait_status, TerminationReason, WorkerLauncher};

/// Number of workers a run spawns.
pub const WORKER_COUNT: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Notification handlers must be registered before spawning workers")]
    HandlersNotRegistered,

    #[error("Failed to register notification handlers: {0}")]
    Register(#[source] HandlerError),

    #[error("Failed to spawn worker for {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A spawned worker awaiting reaping.
#[derive(Debug, Clone)]
struct SpawnedWorker {
    pid: Pid,
    file: PathBuf,
}

/// Outcome of reaping one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerExit {
    pub pid: Pid,
    pub file: PathBuf,
    pub reason: TerminationReason,
}

pub struct WorkerCoordinator {
    launcher: WorkerLauncher,
    log: EventLog,
    own_pid: Pid,
    spawned: Vec<SpawnedWorker>,
    handlers_registered: bool,
}

impl WorkerCoordinator {
    pub fn new(launcher: WorkerLauncher, log: EventLog) -> Self {
        Self {
            launcher,
            log,
            own_pid: Pid::this(),
            spawned: Vec::with_capacity(WORKER_COUNT),
            handlers_registered: false,
        }
    }

    /// PID workers send their notifications to.
    pub fn pid(&self) -> Pid {
        self.own_pid
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Installs the notification handlers. Safe to call more than once.
    ///
    /// Handlers are process-wide: a second coordinator with a different log
    /// gets `Register(AlreadyRegistered)` instead of silently sharing the first
    /// one's log.
    pub fn register_handlers(&mut self) -> Result<(), CoordinatorError> {
        if self.handlers_registered {
            return Ok(());
        }
        notify::register_handlers(HandlerContext::stdout(self.log.clone()))
            .map_err(CoordinatorError::Register)?;
        self.handlers_registered = true;
        debug!(
            "Notification handlers registered, logging to {}",
            self.log.path().display()
        );
        Ok(())
    }

    /// Starts a worker streaming `file` and reporting to this process.
    pub fn spawn_worker(&mut self, file: &Path) -> Result<Pid, CoordinatorError> {
        if !self.handlers_registered {
            return Err(CoordinatorError::HandlersNotRegistered);
        }

        let child = self
            .launcher
            .spawn(file, self.own_pid)
            .map_err(|source| CoordinatorError::Spawn {
                path: file.to_path_buf(),
                source,
            })?;
        let pid = Pid::from_raw(child.id() as i32);
        // Reaped with waitpid below; dropping the handle neither waits nor kills.
        drop(child);

        info!("Spawned worker {} for {}", pid, file.display());
        self.spawned.push(SpawnedWorker {
            pid,
            file: file.to_path_buf(),
        });
        Ok(pid)
    }

    /// PIDs of workers not yet reaped, in spawn order.
    pub fn outstanding(&self) -> Vec<Pid> {
        self.spawned.iter().map(|w| w.pid).collect()
    }

    /// Blocks on every spawned worker in spawn order until each has exited.
    pub fn await_all(&mut self) -> Vec<WorkerExit> {
        let workers: Vec<SpawnedWorker> = self.spawned.drain(..).collect();
        workers
            .into_iter()
            .map(|worker| {
                let reason = wait_for(worker.pid);
                debug!("Worker {} ({}) {}", worker.pid, worker.file.display(), reason);
                WorkerExit {
                    pid: worker.pid,
                    file: worker.file,
                    reason,
                }
            })
            .collect()
    }
}

/// Blocking wait on one PID, resuming after signal interruptions.
fn wait_for(pid: Pid) -> TerminationReason {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                let reason = analyze_wait_status(status);
                if reason != TerminationReason::Unknown {
                    return reason;
                }
            }
            Err(Errno::EINTR) => continue,
            Err(e) => {
                warn!("waitpid({}) failed: {}", pid, e);
                return TerminationReason::Unknown;
            }
        }
    }
}
