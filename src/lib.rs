//! Herakles Memory Watch Library
//!
//! A coordinator process spawns a fixed set of worker processes. Each worker
//! streams a file into memory while watching its own resident set size and
//! signals the coordinator when it first crosses a threshold and again when
//! it finishes. The coordinator records every notification in a shared log
//! guarded by a cross-process lock and echoes it to the console.
//!
//! # Components
//!
//! - **`process`**: resident memory probe (`/proc/self/status`)
//! - **`worker`**: the streaming task, worker spawning, termination reasons
//! - **`notify`**: the two notification kinds, the signal-based notifier and
//!   the coordinator's signal handler
//! - **`event_log`**: timestamped, lock-protected appends that are safe to run
//!   inside a signal handler
//! - **`coordinator`**: handler registration, spawning, in-order reaping
//! - **`generate`**: deterministic input files
//!
//! # Usage
//!
//! ```rust,no_run
//! use herakles_memwatch::coordinator::WorkerCoordinator;
//! use herakles_memwatch::event_log::EventLog;
//! use herakles_memwatch::worker::WorkerLauncher;
//! use std::path::Path;
//!
//! let launcher = WorkerLauncher::current_exe().unwrap();
//! let mut coordinator = WorkerCoordinator::new(launcher, EventLog::new("syslog.log"));
//!
//! coordinator.register_handlers().unwrap();
//! for file in ["worker1.bin", "worker2.bin", "worker3.bin"] {
//!     coordinator.spawn_worker(Path::new(file)).unwrap();
//! }
//!
//! for exit in coordinator.await_all() {
//!     println!("{}: {}", exit.pid, exit.reason);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod event_log;
pub mod generate;
pub mod notify;
pub mod process;
pub mod worker;

// Re-export main types for convenience
pub use coordinator::{CoordinatorError, WorkerCoordinator, WorkerExit, WORKER_COUNT};
pub use event_log::{EventLog, LogError};
pub use notify::{Notification, NotificationKind, Notifier, SignalNotifier};
pub use process::{MemoryProbe, ProcStatusProbe};
pub use worker::{WorkerError, WorkerLauncher, WorkerReport, WorkerTask};
