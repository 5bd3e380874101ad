// src/lib.rs

//! Rollup block validation on deterministic execution machines.
//!
//! Orchestrators fan validation requests out over one or more
//! [`ValidationSpawner`](spawner::ValidationSpawner)s, each of which replays
//! the block in the background and resolves a
//! [`ValidationRun`](run::ValidationRun) with the post-state it reached.

pub mod challenge;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod export;
pub mod fs;
pub mod logging;
pub mod machine;
pub mod run;
pub mod spawner;
pub mod types;

use std::fs as stdfs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigHandle, ValidationConfig, load_and_validate};
use crate::export::{ArtifactExporter, ExportOptions};
use crate::machine::MachineLocator;
use crate::types::{Checkpoint, ValidationInput};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let config = ConfigHandle::new(load_config(&args.config)?);
    let locator = MachineLocator::from_root_path(&args.root_path)
        .with_context(|| format!("locating machines under {:?}", args.root_path))?;

    match args.command {
        Command::ShowConfig => {
            print_config(&config.get(), &locator)?;
        }
        Command::Export {
            input,
            module_root,
            expected_batch,
            expected_pos,
            expected_hash,
        } => {
            let contents = stdfs::read_to_string(&input)
                .with_context(|| format!("reading validation input {:?}", input))?;
            let entry: ValidationInput = serde_json::from_str(&contents)
                .with_context(|| format!("parsing validation input {:?}", input))?;

            let module_root = module_root
                .or_else(|| locator.latest_wasm_module_root())
                .ok_or_else(|| anyhow!("no --module-root given and no latest module root found"))?;

            let exporter = ArtifactExporter::new(
                Arc::new(locator),
                config.arbitrator_fetcher(),
                ExportOptions::default(),
            );
            let expected = Checkpoint::new(expected_hash, expected_batch, expected_pos);
            let dir = exporter.write_to_file(&entry, expected, module_root)?;
            println!("{}", dir.display());
        }
    }

    Ok(())
}

/// Load the config at `path`, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> Result<ValidationConfig> {
    if !path.exists() {
        info!(path = ?path, "config file not found; using defaults");
        return Ok(ValidationConfig::default());
    }
    let cfg = load_and_validate(path).with_context(|| format!("loading config {:?}", path))?;
    debug!(?cfg, "loaded validation config");
    Ok(cfg)
}

fn print_config(cfg: &ValidationConfig, locator: &MachineLocator) -> Result<()> {
    println!("validation-spawner config");
    print!("{}", toml::to_string_pretty(cfg)?);
    println!();
    println!("machine root: {}", locator.root_path().display());
    match locator.latest_wasm_module_root() {
        Some(root) => println!("latest module root: {root}"),
        None => println!("latest module root: <none>"),
    }
    Ok(())
}
