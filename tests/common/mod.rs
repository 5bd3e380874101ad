#![allow(dead_code, unused_imports)]

use std::sync::Arc;

pub use validation_spawner_test_utils::builders::{ValidationInputBuilder, hash};
pub use validation_spawner_test_utils::mock_machine::{
    MachineCall, MachineLog, MachineScript, MockJitLoader, MockLoader, MockMachine,
    RecordingBackendBuilder,
};
pub use validation_spawner_test_utils::{init_tracing, settle, with_timeout};

use validation_spawner::config::{ArbitratorSpawnerConfig, fixed_fetcher};
use validation_spawner::export::{ExportOptions, LaunchStamp};
use validation_spawner::fs::MockFileSystem;
use validation_spawner::machine::MachineLocator;
use validation_spawner::spawner::ArbitratorSpawner;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn arbitrator_config(concurrent_runs_limit: usize) -> ArbitratorSpawnerConfig {
    ArbitratorSpawnerConfig {
        concurrent_runs_limit,
        ..ArbitratorSpawnerConfig::default()
    }
}

/// Arbitrator spawner over `loader` that exports into an in-memory filesystem.
pub fn arbitrator(loader: MockLoader, concurrent_runs_limit: usize) -> ArbitratorSpawner<MockLoader> {
    ArbitratorSpawner::with_export_options(
        loader,
        MachineLocator::new("/machines", None),
        fixed_fetcher(arbitrator_config(concurrent_runs_limit)),
        ExportOptions {
            launch_stamp: LaunchStamp::new("2024_01_02__03_04"),
            prover_root: None,
            fs: Arc::new(MockFileSystem::new()),
        },
    )
}
