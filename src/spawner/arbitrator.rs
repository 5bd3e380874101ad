// src/spawner/arbitrator.rs

//! Native-interpreter spawner.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::challenge::{self, ChallengeBackendBuilder};
use crate::config::{ArbitratorSpawnerConfig, ConfigFetcher};
use crate::errors::Result;
use crate::exec;
use crate::export::{ArtifactExporter, ExportOptions};
use crate::machine::{MachineLoader, MachineLocator};
use crate::run::{ValidationRun, new_run};
use crate::types::{Checkpoint, ModuleRoot, ValidationInput};

use super::{InFlight, Lifecycle, ValidationSpawner, room};

const NAME: &str = "arbitrator";

/// Replays blocks step by step on machines from `L`.
pub struct ArbitratorSpawner<L: MachineLoader> {
    loader: Arc<L>,
    locator: Arc<MachineLocator>,
    config: ConfigFetcher<ArbitratorSpawnerConfig>,
    in_flight: InFlight,
    lifecycle: Lifecycle,
    exporter: ArtifactExporter,
}

impl<L: MachineLoader> fmt::Debug for ArbitratorSpawner<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArbitratorSpawner")
            .field("locator", &self.locator)
            .field("in_flight", &self.in_flight.count())
            .field("started", &self.lifecycle.is_started())
            .finish_non_exhaustive()
    }
}

impl<L: MachineLoader> ArbitratorSpawner<L> {
    pub fn new(
        loader: L,
        locator: MachineLocator,
        config: ConfigFetcher<ArbitratorSpawnerConfig>,
    ) -> Self {
        Self::with_export_options(loader, locator, config, ExportOptions::default())
    }

    pub fn with_export_options(
        loader: L,
        locator: MachineLocator,
        config: ConfigFetcher<ArbitratorSpawnerConfig>,
        options: ExportOptions,
    ) -> Self {
        let locator = Arc::new(locator);
        let exporter = ArtifactExporter::new(Arc::clone(&locator), Arc::clone(&config), options);
        Self {
            loader: Arc::new(loader),
            locator,
            config,
            in_flight: InFlight::new(),
            lifecycle: Lifecycle::new(NAME),
            exporter,
        }
    }

    pub fn in_flight(&self) -> i64 {
        self.in_flight.count()
    }

    pub fn latest_wasm_module_root(&self) -> Option<ModuleRoot> {
        self.locator.latest_wasm_module_root()
    }

    pub fn exporter(&self) -> &ArtifactExporter {
        &self.exporter
    }

    /// Write a reproduction bundle for `input`; see [`crate::export`].
    pub fn write_to_file(
        &self,
        input: &ValidationInput,
        expected: Checkpoint,
        module_root: ModuleRoot,
    ) -> Result<PathBuf> {
        self.exporter.write_to_file(input, expected, module_root)
    }

    /// Build a challenge backend seeded with `input` loaded into a
    /// zero-step machine.
    pub async fn create_execution_backend<B>(
        &self,
        builder: &B,
        module_root: ModuleRoot,
        input: &Arc<ValidationInput>,
    ) -> Result<B::Backend>
    where
        B: ChallengeBackendBuilder<L::Machine>,
    {
        let target_machine_count = (self.config)().target_machine_count;
        challenge::create_execution_backend(
            self.loader.as_ref(),
            builder,
            module_root,
            input,
            target_machine_count,
        )
        .await
    }
}

impl<L: MachineLoader> ValidationSpawner for ArbitratorSpawner<L> {
    fn launch(&self, input: Arc<ValidationInput>, module_root: ModuleRoot) -> ValidationRun {
        let guard = self.in_flight.enter();
        let (resolver, run) = new_run(module_root);

        let (handle, stop) = match self.lifecycle.task_context() {
            Ok(ctx) => ctx,
            Err(err) => {
                debug!(block = input.id, error = %err, "launch on inactive spawner");
                resolver.resolve(Err(err));
                return run;
            }
        };

        let loader = Arc::clone(&self.loader);
        handle.spawn(async move {
            let outcome = exec::execute(loader.as_ref(), &input, module_root, stop).await;
            match &outcome {
                Ok(state) => info!(block = input.id, %module_root, ?state, "validation finished"),
                Err(err) => info!(block = input.id, %module_root, error = %err, "validation failed"),
            }
            drop(guard);
            resolver.resolve(outcome);
        });
        run
    }

    fn start(&self) {
        self.lifecycle.start();
    }

    fn stop(&self) {
        self.lifecycle.stop();
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn room(&self) -> i64 {
        room((self.config)().concurrent_runs_limit, &self.in_flight)
    }
}
