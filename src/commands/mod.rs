//! CLI command implementations for blkflux.
//!
//! This module provides implementations for all CLI subcommands:
//! - `dumpfile`: Trace decoding and printing
//! - `test`: Vocabulary listing
//! - `config`: Configuration file generation
//! - `generate`: Synthetic trace generation

pub mod config;
pub mod dumpfile;
pub mod generate;
pub mod test;

// Re-export command functions
pub use config::command_config;
pub use dumpfile::command_dumpfile;
pub use generate::command_generate_testdata;
pub use test::command_test;
