// src/export/mod.rs

//! Reproduction bundles for offline dispute resolution.
//!
//! A bundle lives at
//! `<root>/<output-path>/<launch stamp>/block_<id>/` and contains:
//!
//! - `run-prover.sh`: runs the native prover against the machine binaries,
//!   `-m <path>` overrides the machine directory, extra args are passed
//!   through,
//! - `sequencer_<N>.bin` per batch and `delayed_<N>.bin` if present,
//! - `preimages.bin` (see [`preimages`]).
//!
//! The layout and the script text are consumed by external tooling and must
//! stay byte-exact.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ArbitratorSpawnerConfig, ConfigFetcher};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::machine::MachineLocator;
use crate::types::{Checkpoint, ModuleRoot, ValidationInput};

pub mod preimages;

pub use preimages::{decode_preimages, encode_preimages};

pub const SCRIPT_FILE: &str = "run-prover.sh";
pub const PREIMAGES_FILE: &str = "preimages.bin";

const REPLAY_BINARY: &str = "replay.wasm";
const LIBRARIES: [&str; 5] = [
    "soft-float.wasm",
    "wasi_stub.wasm",
    "go_stub.wasm",
    "host_io.wasm",
    "brotli.wasm",
];

pub fn sequencer_file_name(number: u64) -> String {
    format!("sequencer_{number}.bin")
}

pub fn delayed_file_name(number: u64) -> String {
    format!("delayed_{number}.bin")
}

/// Names the per-process export directory. Fixed once per spawner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchStamp(String);

impl LaunchStamp {
    pub fn new(stamp: impl Into<String>) -> Self {
        Self(stamp.into())
    }

    /// Current local time as `YYYY_MM_DD__HH_MM`.
    pub fn now() -> Self {
        Self(chrono::Local::now().format("%Y_%m_%d__%H_%M").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LaunchStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything about an export that is not configuration.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub launch_stamp: LaunchStamp,
    /// Directory holding `bin/prover`; emitted as `ROOTPATH` when known.
    pub prover_root: Option<PathBuf>,
    pub fs: Arc<dyn FileSystem>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            launch_stamp: LaunchStamp::now(),
            prover_root: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
            fs: Arc::new(RealFileSystem),
        }
    }
}

pub struct ArtifactExporter {
    locator: Arc<MachineLocator>,
    config: ConfigFetcher<ArbitratorSpawnerConfig>,
    options: ExportOptions,
}

impl fmt::Debug for ArtifactExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactExporter")
            .field("locator", &self.locator)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ArtifactExporter {
    pub fn new(
        locator: Arc<MachineLocator>,
        config: ConfigFetcher<ArbitratorSpawnerConfig>,
        options: ExportOptions,
    ) -> Self {
        Self {
            locator,
            config,
            options,
        }
    }

    pub fn launch_stamp(&self) -> &LaunchStamp {
        &self.options.launch_stamp
    }

    /// Directory the bundle for block `id` is written to.
    ///
    /// Always under the machine root, even when `output-path` is absolute.
    pub fn output_dir(&self, id: u64) -> PathBuf {
        let config = (self.config)();
        let mut dir = self.locator.root_path().to_path_buf();
        dir.extend(
            config
                .output_path
                .components()
                .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_))),
        );
        dir.push(self.options.launch_stamp.as_str());
        dir.push(format!("block_{id}"));
        dir
    }

    /// Write the reproduction bundle for `input` and return its directory.
    ///
    /// Stops at the first failed write; files already written stay on disk.
    pub fn write_to_file(
        &self,
        input: &ValidationInput,
        expected: Checkpoint,
        module_root: ModuleRoot,
    ) -> Result<PathBuf> {
        let fs = &self.options.fs;
        let out_dir = self.output_dir(input.id);
        fs.create_dir_all(&out_dir)?;

        let mut script = self.script_header(expected, module_root);
        script.push_str(&format!(
            " --inbox-position {} --position-within-message {} --last-block-hash {}",
            input.start_state.batch, input.start_state.pos_in_batch, input.start_state.block_hash
        ));

        for batch in &input.batch_info {
            let name = sequencer_file_name(batch.number);
            fs.write(&out_dir.join(&name), &batch.data)?;
            script.push_str(&format!(" --inbox {name}"));
        }

        fs.write(&out_dir.join(PREIMAGES_FILE), &encode_preimages(&input.preimages))?;
        script.push_str(&format!(" --preimages {PREIMAGES_FILE}"));

        if input.has_delayed_msg {
            let name = delayed_file_name(input.delayed_msg_nr);
            script.push_str(&format!(" --delayed-inbox-position {}", input.delayed_msg_nr));
            fs.write(&out_dir.join(&name), &input.delayed_msg)?;
            script.push_str(&format!(" --delayed-inbox {name}"));
        }

        script.push_str(" \"$@\"\n");
        fs.write_executable(&out_dir.join(SCRIPT_FILE), script.as_bytes())?;

        debug!(bytes = script.len(), "wrote {}", SCRIPT_FILE);
        info!(block = input.id, %module_root, dir = ?out_dir, "exported validation input");
        Ok(out_dir)
    }

    /// Everything up to and including the prover's library flags.
    fn script_header(&self, expected: Checkpoint, module_root: ModuleRoot) -> String {
        let mut script = String::from("#!/bin/bash\n");
        script.push_str(&format!(
            "# expected output: batch {}, postion {}, hash {}\n",
            expected.batch, expected.pos_in_batch, expected.block_hash
        ));
        script.push_str(&format!(
            "MACHPATH=\"{}\"\n",
            self.locator.machine_path(module_root).display()
        ));
        if let Some(root) = &self.options.prover_root {
            script.push_str(&format!("ROOTPATH=\"{}\"\n", root.display()));
        }
        script.push_str(concat!(
            "if (( $# > 1 )); then\n",
            "\tif [[ $1 == \"-m\" ]]; then\n",
            "\t\tMACHPATH=$2\n",
            "\t\tshift\n",
            "\t\tshift\n",
            "\tfi\n",
            "fi\n",
        ));
        script.push_str(&format!("${{ROOTPATH}}/bin/prover ${{MACHPATH}}/{REPLAY_BINARY}"));
        for lib in LIBRARIES {
            script.push_str(&format!(" -l ${{MACHPATH}}/{lib}"));
        }
        script
    }
}
