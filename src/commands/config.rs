//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use herakles_memwatch::cli::ConfigFormat;
use herakles_memwatch::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("herakles-memwatch.yaml"),
    };

    let mut content = render_config(&config, format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Memory Watch Configuration
# ===================================
#
# Event Log
# ---------
# log_file: "syslog.log"       # Shared append-only log (relative to the working directory)
#
# Workers
# -------
# memory_threshold_kb: 50000   # RSS (KB) above which a worker reports once
# worker_buffer_mb: 50         # Buffer each worker keeps resident
# work_dir: "."                # Where worker1.bin..worker3.bin are generated
# file_sizes_mb: null          # e.g. [10, 100, 500]; null = prompt interactively
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace (stderr)
"#;

    format!("{comments}\n{yaml}")
}
