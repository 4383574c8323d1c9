//! Configuration management for blkflux.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use anyhow::{bail, Context};
use blkflux::RecordErrorPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, Commands, ConfigFormat, OutputFormat};

/// Default config file locations, searched in order.
const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "/etc/blkflux/blkflux.yaml",
    "/etc/blkflux/blkflux.yml",
    "./blkflux.yaml",
    "./blkflux.json",
];

/// Effective configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory trace files are resolved against
    pub directory: Option<PathBuf>,

    // Logging
    pub log_level: Option<String>,
    pub debug: Option<bool>,

    /// "skip" | "abort"
    #[serde(alias = "record-error-policy")]
    pub record_error_policy: Option<RecordErrorPolicy>,

    /// "text" | "json"
    #[serde(alias = "output-format")]
    pub output_format: Option<String>,

    #[serde(alias = "max-records")]
    pub max_records: Option<u64>,

    #[serde(alias = "show-payload")]
    pub show_payload: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: Some(PathBuf::from(".")),
            log_level: Some("warn".into()),
            debug: Some(false),
            record_error_policy: Some(RecordErrorPolicy::Skip),
            output_format: Some("text".into()),
            max_records: None,
            show_payload: Some(false),
        }
    }
}

impl Config {
    pub fn output_format(&self) -> OutputFormat {
        match self.output_format.as_deref() {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Validate effective config (used by --show-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    if let Some(format) = cfg.output_format.as_deref() {
        if format != "text" && format != "json" {
            bail!("Invalid output_format '{}', expected 'text' or 'json'", format);
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];
        if !LEVELS.contains(&level) {
            bail!("Invalid log_level '{}', expected one of {}", level, LEVELS.join(", "));
        }
    }

    if cfg.max_records == Some(0) {
        bail!("max_records must be greater than 0");
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if args.debug {
        config.debug = Some(true);
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    if let Some(Commands::Dumpfile {
        directory,
        format,
        max_records,
        strict,
        show_payload,
        ..
    }) = &args.command
    {
        if let Some(dir) = directory {
            config.directory = Some(dir.clone());
        }
        if let Some(format) = format {
            config.output_format = Some(
                match format {
                    OutputFormat::Text => "text",
                    OutputFormat::Json => "json",
                }
                .into(),
            );
        }
        if max_records.is_some() {
            config.max_records = *max_records;
        }
        if *strict {
            config.record_error_policy = Some(RecordErrorPolicy::Abort);
        }
        if *show_payload {
            config.show_payload = Some(true);
        }
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("Config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse_config(&content, &path)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

fn parse_config(content: &str, path: &Path) -> anyhow::Result<Config> {
    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(content)
            .with_context(|| format!("Invalid JSON config {}", path.display()))?,
        Some("toml") => toml::from_str(content)
            .with_context(|| format!("Invalid TOML config {}", path.display()))?,
        // Default to YAML
        _ => serde_yaml::from_str(content)
            .with_context(|| format!("Invalid YAML config {}", path.display()))?,
    };
    Ok(config)
}

/// Renders configuration in the requested format
pub fn render_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_effective_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_invalid_output_format() {
        let cfg = Config {
            output_format: Some("csv".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_zero_max_records_rejected() {
        let cfg = Config {
            max_records: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_load_yaml_config() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "directory: /var/trace\nrecord-error-policy: abort\nmax_records: 10").unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.directory, Some(PathBuf::from("/var/trace")));
        assert_eq!(cfg.record_error_policy, Some(RecordErrorPolicy::Abort));
        assert_eq!(cfg.max_records, Some(10));
        assert!(cfg.debug.is_none());
    }

    #[test]
    fn test_load_json_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"output_format": "json", "show_payload": true}}"#).unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.output_format(), OutputFormat::Json);
        assert_eq!(cfg.show_payload, Some(true));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        assert!(load_config(Some(Path::new("/nonexistent/blkflux.yaml"))).is_err());
    }

    #[test]
    fn test_render_roundtrip_toml() {
        let rendered = render_config(&Config::default(), &ConfigFormat::Toml).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.record_error_policy, Some(RecordErrorPolicy::Skip));
        assert_eq!(parsed.directory, Some(PathBuf::from(".")));
    }
}
