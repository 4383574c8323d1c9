//! CLI arguments and subcommands for blkflux.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
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
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Record output format for `dumpfile`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "blkflux",
    about = "Decode blktrace binary streams",
    long_about = "Decode blktrace binary streams.\n\n\
                  Reads the per-CPU files written by the kernel block I/O tracer, \
                  classifies every event and tracks the process names and clock \
                  anchor carried by notify records.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug output (forces debug log level)
    #[arg(long, env = "BLKFLUX_DEBUG", global = true)]
    pub debug: bool,

    /// Log level (default: warn)
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a trace file and print every record with its classification
    Dumpfile {
        /// Directory containing the trace file
        #[arg(short = 'D', long)]
        directory: Option<PathBuf>,

        /// Trace file name
        filename: PathBuf,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Stop after N decoded records (skipped records are not counted)
        #[arg(short = 'n', long)]
        max_records: Option<u64>,

        /// Abort on the first record-level error instead of skipping it
        #[arg(long)]
        strict: bool,

        /// Hex-dump record payloads in text output
        #[arg(long)]
        show_payload: bool,
    },

    /// Print the category vocabulary and the debug flag
    Test,

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Generate a synthetic trace file
    GenerateTestdata {
        /// Output file path
        #[arg(short = 'o', long, default_value = "testdata.blktrace.0")]
        output: PathBuf,

        /// Number of I/O events to generate
        #[arg(short = 'n', long, default_value_t = 100)]
        records: u32,

        /// Random seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}
