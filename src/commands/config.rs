//! Config command implementation.
//!
//! Generates configuration files in various formats.

use anyhow::Context;
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(output: Option<PathBuf>, format: ConfigFormat) -> anyhow::Result<()> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("blkflux.yaml"),
    };

    let mut content = render_config(&config, &format)?;
    if let ConfigFormat::Yaml = format {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# blkflux Configuration
# ======================
#
# directory: "."               # Directory trace files are resolved against
# log_level: "warn"            # off, error, warn, info, debug, trace
# debug: false                 # Force debug logging
# record_error_policy: skip    # skip | abort on unknown subtypes and bad notify payloads
# output_format: text          # text | json
# max_records: null            # Stop after N records
# show_payload: false          # Hex-dump payloads in text output

"#;
    format!("{}{}", comments, yaml)
}
