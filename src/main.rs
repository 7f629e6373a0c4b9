//! herakles-memwatch - version 0.1.0
//!
//! Memory-watching file workers with signal-driven, lock-protected logging.
//! This is the main entry point that sets up logging and dispatches subcommands.

mod commands;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use commands::{command_check, command_config, command_generate, command_run, command_worker};
use herakles_memwatch::cli::{Args, Commands, LogLevel};
use herakles_memwatch::config::{resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing on stderr. Stdout is reserved for notification lines.
fn setup_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("⚠️  Failed to set tracing subscriber: {}", e);
    }
}

/// Effective log level: CLI flag, then config file, then info.
fn effective_log_level(config: &Config, args: &Args) -> LogLevel {
    args.log_level
        .or_else(|| {
            config
                .log_level
                .as_deref()
                .and_then(|level| LogLevel::from_str(level, true).ok())
        })
        .unwrap_or(LogLevel::Info)
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Workers get everything they need on the command line and never read config files
    if let Some(Commands::Worker {
        file,
        target_pid,
        threshold_kb,
        buffer_mb,
    }) = &args.command
    {
        setup_logging(args.log_level.unwrap_or(LogLevel::Info));
        command_worker(file, *target_pid, *threshold_kb, *buffer_mb);
    }

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Config generation must work even when the current config is broken
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), *format, *commented);
    }

    let config = load_validated_config(&args)?;
    let log_level = effective_log_level(&config, &args);
    setup_logging(log_level);

    match &args.command {
        Some(Commands::Check) => command_check(&config),
        Some(Commands::Generate { output, size_mb }) => command_generate(output, *size_mb),
        Some(Commands::Config { .. }) => unreachable!("Config handled above"),
        Some(Commands::Worker { .. }) => unreachable!("Worker handled above"),
        None => {
            info!("Starting herakles-memwatch coordinator");
            command_run(&config, log_level)
        }
    }
}

/// Main application entry point.
fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_precedence() {
        let mut config = Config::default();
        config.log_level = Some("debug".into());

        let args = Args::try_parse_from(["herakles-memwatch"]).unwrap();
        assert_eq!(effective_log_level(&config, &args), LogLevel::Debug);

        let args = Args::try_parse_from(["herakles-memwatch", "--log-level", "warn"]).unwrap();
        assert_eq!(effective_log_level(&config, &args), LogLevel::Warn);

        config.log_level = None;
        let args = Args::try_parse_from(["herakles-memwatch"]).unwrap();
        assert_eq!(effective_log_level(&config, &args), LogLevel::Info);
    }
}
