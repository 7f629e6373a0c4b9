//! CLI arguments and subcommands for herakles-memwatch.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-memwatch",
    about = "Spawns memory-watching file workers and logs their notifications",
    long_about = "Spawns memory-watching file workers and logs their notifications.\n\n\
                  Generates one input file per worker, starts three worker processes that stream \
                  their file while watching their own resident memory, and records every \
                  threshold crossing and completion in a shared, lock-protected log.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Shared event log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Resident memory threshold in KB
    #[arg(long)]
    pub threshold_kb: Option<u64>,

    /// Buffer each worker keeps resident, in MB
    #[arg(long)]
    pub buffer_mb: Option<usize>,

    /// Directory for the generated worker files
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Worker file sizes in MB (comma-separated, skips the prompts)
    #[arg(long, value_delimiter = ',')]
    pub sizes: Option<Vec<u64>>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and system requirements
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Generate one worker input file
    Generate {
        /// Output file path
        #[arg(short = 'o', long, default_value = "worker1.bin")]
        output: PathBuf,

        /// File size in MB
        #[arg(long)]
        size_mb: u64,
    },

    /// Run as a worker process (spawned by the coordinator)
    #[command(hide = true)]
    Worker {
        /// File to stream
        #[arg(long)]
        file: PathBuf,

        /// PID to notify
        #[arg(long)]
        target_pid: i32,

        /// Resident memory threshold in KB
        #[arg(long)]
        threshold_kb: u64,

        /// Resident buffer size in MB
        #[arg(long)]
        buffer_mb: usize,
    },
}
