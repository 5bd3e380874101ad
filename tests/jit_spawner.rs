mod common;
use crate::common::{
    MockJitLoader, TestResult, ValidationInputBuilder, hash, init_tracing, settle, with_timeout,
};

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::{Semaphore, mpsc};

use validation_spawner::config::{ConfigHandle, JitSpawnerConfig, ValidationConfig, fixed_fetcher};
use validation_spawner::errors::{MachineError, ValidationError};
use validation_spawner::machine::JitMachineConfig;
use validation_spawner::spawner::{JitSpawner, ValidationSpawner};
use validation_spawner::types::Checkpoint;

fn jit_config(cranelift: bool, concurrent_runs_limit: usize) -> JitSpawnerConfig {
    JitSpawnerConfig {
        concurrent_runs_limit,
        cranelift,
    }
}

#[tokio::test]
async fn name_follows_cranelift_flag() -> TestResult {
    init_tracing();
    let (fatal_tx, _fatal_rx) = mpsc::unbounded_channel();
    let handle = ConfigHandle::new(ValidationConfig::default());
    let spawner = JitSpawner::new(
        MockJitLoader::new(Ok(Checkpoint::default())),
        handle.jit_fetcher(),
        fatal_tx,
    );
    assert_eq!(spawner.name(), "jit-cranelift");

    let mut cfg = ValidationConfig::default();
    cfg.jit.cranelift = false;
    handle.replace(cfg)?;
    assert_eq!(spawner.name(), "jit");
    Ok(())
}

#[tokio::test]
async fn prove_result_resolves_the_run() -> TestResult {
    init_tracing();
    let expected = Checkpoint::new(hash(4), 8, 1);
    let loader = MockJitLoader::new(Ok(expected));
    let machine = loader.machine();
    let (fatal_tx, _fatal_rx) = mpsc::unbounded_channel();
    let spawner = JitSpawner::new(loader, fixed_fetcher(jit_config(true, 3)), fatal_tx);
    spawner.start();

    let input = ValidationInputBuilder::new(77)
        .preimage(hash(0xab), b"known")
        .build_arc();
    let run = spawner.launch(input, hash(1));
    with_timeout(run.wait_ready()).await?;

    assert_eq!(run.result()?, expected);
    assert_eq!(machine.proved_blocks(), vec![77]);
    assert_eq!(spawner.room(), 3);
    Ok(())
}

#[tokio::test]
async fn prove_failure_is_wrapped() {
    init_tracing();
    let loader = MockJitLoader::new(Err(MachineError::Fault("bad block".into())));
    let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
    let spawner = JitSpawner::new(loader, fixed_fetcher(jit_config(false, 0)), fatal_tx);
    spawner.start();

    let run = spawner.launch(ValidationInputBuilder::new(1).build_arc(), hash(1));
    let err = with_timeout(run.wait_ready()).await.unwrap_err();

    assert!(matches!(err, ValidationError::Prove(MachineError::Fault(_))));
    assert!(fatal_rx.try_recv().is_err());
}

#[tokio::test]
async fn crashed_loader_is_reported_as_fatal() {
    init_tracing();
    let loader = MockJitLoader::failing(MachineError::Crashed("helper exited".into()));
    let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
    let spawner = JitSpawner::new(loader, fixed_fetcher(jit_config(true, 0)), fatal_tx);
    spawner.start();

    let run = spawner.launch(ValidationInputBuilder::new(1).build_arc(), hash(6));
    let err = with_timeout(run.wait_ready()).await.unwrap_err();

    assert!(matches!(
        err,
        ValidationError::Load {
            source: MachineError::Crashed(_),
            ..
        }
    ));
    let fatal = fatal_rx.try_recv().expect("fatal error forwarded");
    assert!(format!("{fatal:#}").contains("helper exited"));
}

#[tokio::test]
async fn non_fatal_load_failure_stays_local() {
    init_tracing();
    let loader = MockJitLoader::failing(MachineError::Unavailable(hash(6)));
    let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
    let spawner = JitSpawner::new(loader, fixed_fetcher(jit_config(true, 0)), fatal_tx);
    spawner.start();

    let run = spawner.launch(ValidationInputBuilder::new(1).build_arc(), hash(6));
    let err = with_timeout(run.wait_ready()).await.unwrap_err();

    assert!(matches!(err, ValidationError::Load { .. }));
    assert!(fatal_rx.try_recv().is_err());
}

#[tokio::test]
async fn stop_cancels_proving_and_stops_loader() {
    init_tracing();
    let gate = Arc::new(Semaphore::new(0));
    let loader = MockJitLoader::gated(Ok(Checkpoint::default()), Arc::clone(&gate));
    let loader_stopped = loader.stop_flag();
    let (fatal_tx, _fatal_rx) = mpsc::unbounded_channel();
    let spawner = JitSpawner::new(loader, fixed_fetcher(jit_config(true, 1)), fatal_tx);
    spawner.start();

    let run = spawner.launch(ValidationInputBuilder::new(1).build_arc(), hash(1));
    let second = spawner.launch(ValidationInputBuilder::new(2).build_arc(), hash(1));
    settle().await;
    assert_eq!(spawner.in_flight(), 2);
    assert_eq!(spawner.room(), -1);

    spawner.stop();
    for run in [&run, &second] {
        let err = with_timeout(run.wait_ready()).await.unwrap_err();
        assert!(matches!(err, ValidationError::Cancelled));
    }
    assert_eq!(spawner.in_flight(), 0);
    assert!(loader_stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn loader_is_built_with_configured_cranelift_flag() -> TestResult {
    init_tracing();
    let (fatal_tx, _fatal_rx) = mpsc::unbounded_channel();
    let mut seen = None;

    let spawner = JitSpawner::build(
        |machine_config: JitMachineConfig| {
            seen = Some(machine_config);
            Ok(MockJitLoader::new(Ok(Checkpoint::default())))
        },
        fixed_fetcher(jit_config(false, 0)),
        fatal_tx,
    )?;

    let machine_config = seen.expect("loader factory called");
    assert!(!machine_config.cranelift);
    assert_eq!(
        machine_config.wasm_memory_usage_limit,
        JitMachineConfig::default().wasm_memory_usage_limit
    );
    assert_eq!(spawner.name(), "jit");
    Ok(())
}

#[tokio::test]
async fn loader_build_failure_is_returned() {
    init_tracing();
    let (fatal_tx, _fatal_rx) = mpsc::unbounded_channel();

    let res = JitSpawner::<MockJitLoader>::build(
        |_| Err(ValidationError::Backend("no jit binary".into())),
        fixed_fetcher(jit_config(true, 0)),
        fatal_tx,
    );

    assert!(matches!(res, Err(ValidationError::Backend(_))));
}
