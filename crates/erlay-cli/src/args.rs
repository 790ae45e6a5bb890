//! Command-line argument definitions for the Erlay CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control the schema and report paths,
//! configuration file selection, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the Erlay layout tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input schema document (TOML)
    #[arg(help = "Path to the schema document")]
    pub input: String,

    /// Path to the output report; the report goes to stdout when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
