//! CLI command implementations for herakles-memwatch.
//!
//! This module provides implementations for all CLI modes:
//! - `run`: Coordinator (default mode)
//! - `worker`: Worker subprocess (hidden)
//! - `check`: System validation
//! - `config`: Configuration file generation
//! - `generate`: Worker input file generation

pub mod check;
pub mod config;
pub mod generate;
pub mod run;
pub mod worker;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use generate::command_generate;
pub use run::command_run;
pub use worker::command_worker;
