//! Resident memory probing from /proc.
//!
//! Workers call the probe after every chunk they read, so the default probe
//! reads the small `/proc/self/status` file rather than smaps.

use std::fs;
use std::path::{Path, PathBuf};

/// Status file of the calling process.
pub const SELF_STATUS_PATH: &str = "/proc/self/status";

/// Errors returned by a memory probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No VmRSS entry in {}", .0.display())]
    MissingRss(PathBuf),
}

/// Source of the current process's resident set size.
pub trait MemoryProbe {
    /// Current resident memory in kilobytes.
    fn resident_kb(&self) -> Result<u64, ProbeError>;
}

/// Reads `VmRSS` from a `/proc/<pid>/status` file.
#[derive(Debug, Clone)]
pub struct ProcStatusProbe {
    status_path: PathBuf,
}

impl ProcStatusProbe {
    /// Probe for the calling process.
    pub fn current() -> Self {
        Self::from_status_file(SELF_STATUS_PATH)
    }

    pub fn from_status_file(path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: path.into(),
        }
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }
}

impl Default for ProcStatusProbe {
    fn default() -> Self {
        Self::current()
    }
}

impl MemoryProbe for ProcStatusProbe {
    fn resident_kb(&self) -> Result<u64, ProbeError> {
        let content = fs::read_to_string(&self.status_path).map_err(|source| ProbeError::Io {
            path: self.status_path.clone(),
            source,
        })?;

        parse_vmrss_kb(&content).ok_or_else(|| ProbeError::MissingRss(self.status_path.clone()))
    }
}

/// Extracts the `VmRSS:` value (kB) from status file content.
pub fn parse_vmrss_kb(content: &str) -> Option<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(parse_kb_value)
}

/// Parses kilobyte values from /proc lines such as `   1234 kB`.
pub fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}
