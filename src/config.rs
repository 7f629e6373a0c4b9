//! Configuration management for herakles-memwatch.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use crate::coordinator::WORKER_COUNT;
use crate::event_log::DEFAULT_LOG_FILE;
use crate::worker::{DEFAULT_BUFFER_MB, DEFAULT_THRESHOLD_KB};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default locations searched when no `--config` is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "/etc/herakles/memwatch.yaml",
    "./herakles-memwatch.yaml",
    "./herakles-memwatch.json",
    "./herakles-memwatch.toml",
];

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Event log
    #[serde(alias = "log-file")]
    pub log_file: Option<PathBuf>,

    // Workers
    #[serde(alias = "memory-threshold-kb")]
    pub memory_threshold_kb: Option<u64>,
    #[serde(alias = "worker-buffer-mb")]
    pub worker_buffer_mb: Option<usize>,
    #[serde(alias = "work-dir")]
    pub work_dir: Option<PathBuf>,
    /// Sizes for worker1.bin..worker3.bin; prompts when unset
    #[serde(alias = "file-sizes-mb")]
    pub file_sizes_mb: Option<Vec<u64>>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            memory_threshold_kb: Some(DEFAULT_THRESHOLD_KB),
            worker_buffer_mb: Some(DEFAULT_BUFFER_MB),
            work_dir: Some(PathBuf::from(".")),
            file_sizes_mb: None,
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }

    pub fn threshold_kb(&self) -> u64 {
        self.memory_threshold_kb.unwrap_or(DEFAULT_THRESHOLD_KB)
    }

    pub fn buffer_mb(&self) -> usize {
        self.worker_buffer_mb.unwrap_or(DEFAULT_BUFFER_MB)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.threshold_kb() == 0 {
        return Err("memory_threshold_kb must be greater than 0".into());
    }

    if cfg.buffer_mb() == 0 {
        return Err("worker_buffer_mb must be greater than 0".into());
    }

    if cfg.log_file().as_os_str().is_empty() {
        return Err("log_file must not be empty".into());
    }

    if let Some(sizes) = &cfg.file_sizes_mb {
        if sizes.len() != WORKER_COUNT {
            return Err(format!(
                "file_sizes_mb must list exactly {} sizes, got {}",
                WORKER_COUNT,
                sizes.len()
            )
            .into());
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        match level {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => {}
            other => {
                return Err(format!(
                    "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
                    other
                )
                .into());
            }
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(log_file) = &args.log_file {
        config.log_file = Some(log_file.clone());
    }
    if let Some(threshold_kb) = args.threshold_kb {
        config.memory_threshold_kb = Some(threshold_kb);
    }
    if let Some(buffer_mb) = args.buffer_mb {
        config.worker_buffer_mb = Some(buffer_mb);
    }
    if let Some(work_dir) = &args.work_dir {
        config.work_dir = Some(work_dir.clone());
    }
    if let Some(sizes) = &args.sizes {
        config.file_sizes_mb = Some(sizes.clone());
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    Ok(config)
}

/// Loads configuration from an explicit path or the first existing default location.
/// Fields missing from the file keep their default values.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().copied().map(Path::new).find(|p| p.exists()) {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;

    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_with_defaults(loaded))
}

fn merge_with_defaults(loaded: Config) -> Config {
    let defaults = Config::default();
    Config {
        log_file: loaded.log_file.or(defaults.log_file),
        memory_threshold_kb: loaded.memory_threshold_kb.or(defaults.memory_threshold_kb),
        worker_buffer_mb: loaded.worker_buffer_mb.or(defaults.worker_buffer_mb),
        work_dir: loaded.work_dir.or(defaults.work_dir),
        file_sizes_mb: loaded.file_sizes_mb.or(defaults.file_sizes_mb),
        log_level: loaded.log_level.or(defaults.log_level),
    }
}

/// Renders configuration in the requested format
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["herakles-memwatch"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        validate_effective_config(&config).unwrap();
        assert_eq!(config.log_file(), PathBuf::from("syslog.log"));
        assert_eq!(config.threshold_kb(), 50_000);
        assert_eq!(config.buffer_mb(), 50);
        assert!(config.file_sizes_mb.is_none());
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memwatch.yaml");
        fs::write(
            &path,
            "memory_threshold_kb: 1000\nworker_buffer_mb: 8\nlog_file: from-file.log\n",
        )
        .unwrap();

        let config = resolve_config(&args(&[
            "-c",
            path.to_str().unwrap(),
            "--threshold-kb",
            "2000",
            "--sizes",
            "1,2,3",
        ]))
        .unwrap();

        assert_eq!(config.threshold_kb(), 2000);
        assert_eq!(config.buffer_mb(), 8);
        assert_eq!(config.log_file(), PathBuf::from("from-file.log"));
        assert_eq!(config.file_sizes_mb, Some(vec![1, 2, 3]));
        assert_eq!(config.work_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("memwatch.json");
        fs::write(&json, r#"{"file_sizes_mb": [10, 100, 500]}"#).unwrap();
        let config = load_config(Some(&json)).unwrap();
        assert_eq!(config.file_sizes_mb, Some(vec![10, 100, 500]));
        assert_eq!(config.threshold_kb(), DEFAULT_THRESHOLD_KB);

        let toml_path = dir.path().join("memwatch.toml");
        fs::write(&toml_path, "worker_buffer_mb = 64\n").unwrap();
        assert_eq!(load_config(Some(&toml_path)).unwrap().buffer_mb(), 64);
    }

    #[test]
    fn test_no_config_ignores_file() {
        let config = resolve_config(&args(&["--no-config", "--log-file", "x.log"])).unwrap();
        assert_eq!(config.log_file(), PathBuf::from("x.log"));
        assert_eq!(config.threshold_kb(), DEFAULT_THRESHOLD_KB);
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.yaml"))).is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.memory_threshold_kb = Some(0);
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.worker_buffer_mb = Some(0);
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.file_sizes_mb = Some(vec![1, 2]);
        let err = validate_effective_config(&config).unwrap_err();
        assert!(err.to_string().contains("exactly 3"));

        let mut config = Config::default();
        config.log_level = Some("loud".into());
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.log_file = Some(PathBuf::new());
        assert!(validate_effective_config(&config).is_err());
    }

    #[test]
    fn test_render_round_trips_yaml() {
        let config = Config::default();
        let yaml = render_config(&config, ConfigFormat::Yaml).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
