//! blkflux - version 0.1.0
//!
//! blktrace stream decoder with tracing logging.
//! This is the main entry point that resolves configuration and dispatches subcommands.

mod cli;
mod commands;
mod config;

use clap::{CommandFactory, Parser};
use tracing::{debug, Level};

use cli::{Args, Commands};
use commands::{command_config, command_dumpfile, command_generate_testdata, command_test};
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) {
    let log_level = if config.debug.unwrap_or(false) {
        Some(Level::DEBUG)
    } else {
        match config.log_level.as_deref() {
            Some("off") => None,
            Some("error") => Some(Level::ERROR),
            Some("info") => Some(Level::INFO),
            Some("debug") => Some(Level::DEBUG),
            Some("trace") => Some(Level::TRACE),
            _ => Some(Level::WARN),
        }
    };

    let Some(log_level) = log_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    debug!("Logging initialized with level: {:?}", log_level);
}

fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Dumpfile { filename, .. } => command_dumpfile(&filename, &config),
        Commands::Test => command_test(&config),
        Commands::Config { output, format } => command_config(output, format),
        Commands::GenerateTestdata {
            output,
            records,
            seed,
        } => command_generate_testdata(output, records, seed),
    }
}

/// Main application entry point.
fn main() {
    let args = Args::parse();

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {:#}", e);
        std::process::exit(1);
    }

    if args.show_config {
        if let Err(e) = show_config(&config, &args.config_format) {
            eprintln!("❌ {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    let Some(command) = args.command else {
        // Nothing to do without a subcommand
        let _ = Args::command().print_help();
        std::process::exit(2);
    };

    setup_logging(&config);

    if let Err(e) = run(command, config) {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}
