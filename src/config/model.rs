// src/config/model.rs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level validation configuration as read from a TOML file.
///
/// ```toml
/// [arbitrator]
/// concurrent-runs-limit = 0
/// output-path = "./target/output"
/// target-machine-count = 4
///
/// [jit]
/// concurrent-runs-limit = 0
/// cranelift = true
/// ```
///
/// The two sections are entirely separate; they share a file for
/// convenience only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    #[serde(default)]
    pub arbitrator: ArbitratorSpawnerConfig,

    #[serde(default)]
    pub jit: JitSpawnerConfig,
}

/// `[arbitrator]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ArbitratorSpawnerConfig {
    /// Advertised number of concurrent runs; `0` means host parallelism.
    /// Hot-reloadable.
    #[serde(default)]
    pub concurrent_runs_limit: usize,

    /// Where reproduction bundles are written, relative to the machine root.
    /// Hot-reloadable.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Passed to challenge backends built from this spawner.
    #[serde(default = "default_target_machine_count")]
    pub target_machine_count: usize,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./target/output")
}

fn default_target_machine_count() -> usize {
    4
}

impl Default for ArbitratorSpawnerConfig {
    fn default() -> Self {
        Self {
            concurrent_runs_limit: 0,
            output_path: default_output_path(),
            target_machine_count: default_target_machine_count(),
        }
    }
}

/// `[jit]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct JitSpawnerConfig {
    /// Hot-reloadable; `0` means host parallelism.
    #[serde(default)]
    pub concurrent_runs_limit: usize,

    /// Use Cranelift instead of LLVM when compiling machines.
    #[serde(default = "default_cranelift")]
    pub cranelift: bool,
}

fn default_cranelift() -> bool {
    true
}

impl Default for JitSpawnerConfig {
    fn default() -> Self {
        Self {
            concurrent_runs_limit: 0,
            cranelift: default_cranelift(),
        }
    }
}
