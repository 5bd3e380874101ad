// src/spawner/jit.rs

//! JIT-accelerated spawner.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigFetcher, JitSpawnerConfig};
use crate::errors::{Result, ValidationError};
use crate::machine::{JitMachine, JitMachineConfig, JitMachineLoader, preimage_resolver};
use crate::run::{ValidationRun, new_run};
use crate::types::{Checkpoint, ModuleRoot, ValidationInput};

use super::{InFlight, Lifecycle, StopSignal, ValidationSpawner, room};

/// Process-wide sink for failures that make a backend unusable.
pub type FatalErrorSender = mpsc::UnboundedSender<anyhow::Error>;

/// Replays whole blocks on JIT machines from `L`.
pub struct JitSpawner<L: JitMachineLoader> {
    loader: Arc<L>,
    config: ConfigFetcher<JitSpawnerConfig>,
    fatal_tx: FatalErrorSender,
    in_flight: InFlight,
    lifecycle: Lifecycle,
}

impl<L: JitMachineLoader> fmt::Debug for JitSpawner<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitSpawner")
            .field("name", &self.name())
            .field("in_flight", &self.in_flight.count())
            .field("started", &self.lifecycle.is_started())
            .finish_non_exhaustive()
    }
}

impl<L: JitMachineLoader> JitSpawner<L> {
    /// Build the loader from the current `cranelift` setting, so the
    /// spawner's name and the compiled machines agree.
    pub fn build<F>(
        make_loader: F,
        config: ConfigFetcher<JitSpawnerConfig>,
        fatal_tx: FatalErrorSender,
    ) -> Result<Self>
    where
        F: FnOnce(JitMachineConfig) -> Result<L>,
    {
        let machine_config = JitMachineConfig {
            cranelift: config().cranelift,
            ..JitMachineConfig::default()
        };
        let loader = make_loader(machine_config)?;
        Ok(Self::new(loader, config, fatal_tx))
    }

    /// Wrap an existing loader. It must have been built with the same
    /// `cranelift` flag the config reports; see [`build`](Self::build).
    pub fn new(loader: L, config: ConfigFetcher<JitSpawnerConfig>, fatal_tx: FatalErrorSender) -> Self {
        Self {
            loader: Arc::new(loader),
            config,
            fatal_tx,
            in_flight: InFlight::new(),
            lifecycle: Lifecycle::new("jit"),
        }
    }

    pub fn in_flight(&self) -> i64 {
        self.in_flight.count()
    }
}

async fn execute<L: JitMachineLoader>(
    loader: &L,
    fatal_tx: &FatalErrorSender,
    input: &Arc<ValidationInput>,
    module_root: ModuleRoot,
    mut stop: StopSignal,
) -> Result<Checkpoint> {
    let machine = match loader.machine(module_root).await {
        Ok(machine) => machine,
        Err(source) => {
            if source.is_fatal() {
                error!(%module_root, error = %source, "jit machine loader failed fatally");
                if fatal_tx
                    .send(anyhow::Error::new(source.clone()).context("jit machine loader"))
                    .is_err()
                {
                    warn!("fatal error channel closed; dropping loader failure");
                }
            }
            return Err(ValidationError::Load {
                module_root,
                source,
            });
        }
    };

    let resolver = preimage_resolver(input);
    tokio::select! {
        biased;
        _ = stop.stopped() => {
            debug!(%module_root, block = input.id, "jit validation cancelled");
            Err(ValidationError::Cancelled)
        }
        res = machine.prove(input, resolver) => res.map_err(ValidationError::Prove),
    }
}

impl<L: JitMachineLoader> ValidationSpawner for JitSpawner<L> {
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
        let fatal_tx = self.fatal_tx.clone();
        handle.spawn(async move {
            let outcome = execute(loader.as_ref(), &fatal_tx, &input, module_root, stop).await;
            if let Err(err) = &outcome {
                info!(block = input.id, %module_root, error = %err, "jit validation failed");
            }
            drop(guard);
            resolver.resolve(outcome);
        });
        run
    }

    fn start(&self) {
        self.lifecycle.start();
    }

    /// Stops the lifecycle and tears down the loader.
    fn stop(&self) {
        self.lifecycle.stop();
        self.loader.stop();
    }

    fn name(&self) -> &'static str {
        if (self.config)().cranelift {
            "jit-cranelift"
        } else {
            "jit"
        }
    }

    fn room(&self) -> i64 {
        room((self.config)().concurrent_runs_limit, &self.in_flight)
    }
}
