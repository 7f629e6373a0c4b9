//! Process introspection used by workers.
//!
//! - `memory`: resident memory probing from /proc

pub mod memory;

pub use memory::{parse_kb_value, parse_vmrss_kb, MemoryProbe, ProbeError, ProcStatusProbe};
