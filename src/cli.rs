// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::loader::default_config_path;
use crate::types::{Bytes32, ModuleRoot};

/// Command-line arguments for `validation-spawner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "validation-spawner",
    version,
    about = "Replay rollup blocks on an execution machine and export reproduction bundles.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Missing file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Directory holding one sub-directory of machine binaries per module root.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root_path: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `VALIDATOR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the effective configuration and the latest module root.
    ShowConfig,

    /// Write a reproduction bundle for a JSON-encoded validation input.
    Export {
        /// JSON file holding a `ValidationInput`.
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Module root to replay against; defaults to the latest one.
        #[arg(long, value_name = "HEX")]
        module_root: Option<ModuleRoot>,

        /// Expected post-state batch, recorded in the script header.
        #[arg(long, default_value_t = 0)]
        expected_batch: u64,

        /// Expected post-state position within the batch.
        #[arg(long, default_value_t = 0)]
        expected_pos: u64,

        /// Expected post-state block hash.
        #[arg(long, value_name = "HEX", default_value_t = Bytes32::ZERO)]
        expected_hash: Bytes32,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
