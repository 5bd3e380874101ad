mod common;
use crate::common::{
    MachineCall, MachineLog, MachineScript, MockLoader, RecordingBackendBuilder, TestResult,
    ValidationInputBuilder, arbitrator, hash, init_tracing,
};

use std::sync::Arc;

use validation_spawner::errors::{MachineError, ValidationError};
use validation_spawner::machine::Machine;
use validation_spawner::types::Checkpoint;

#[tokio::test]
async fn backend_receives_frozen_loaded_machine() -> TestResult {
    init_tracing();
    let log = Arc::new(MachineLog::default());
    let spawner = arbitrator(MockLoader::new(MachineScript::default(), Arc::clone(&log)), 0);
    let input = ValidationInputBuilder::new(5)
        .start_state(hash(0x10), 2, 3)
        .batch(2, b"two")
        .build_arc();

    let backend = spawner
        .create_execution_backend(&RecordingBackendBuilder::default(), hash(1), &input)
        .await?;

    assert_eq!(backend.target_machine_count, 4);
    assert_eq!(
        backend.initial_machine.start_state(),
        Checkpoint::new(hash(0x10), 2, 3)
    );
    assert!(
        log.calls()
            .contains(&MachineCall::SequencerMessage(2, b"two".to_vec()))
    );
    assert_eq!(log.step_calls(), 0);

    // The snapshot stays alive as long as the backend owns it.
    assert_eq!(log.live_clones(), 1);
    let mut fork = backend.initial_machine.fork();
    assert_eq!(log.live_clones(), 2);
    fork.step(1).await?;
    assert_eq!(backend.initial_machine.steps_taken(), 0);

    drop(fork);
    drop(backend);
    assert_eq!(log.live_clones(), 0);
    Ok(())
}

#[tokio::test]
async fn feed_errors_release_the_clone() {
    init_tracing();
    let log = Arc::new(MachineLog::default());
    let script = MachineScript {
        reject_sequencer: Some(2),
        ..MachineScript::default()
    };
    let spawner = arbitrator(MockLoader::new(script, Arc::clone(&log)), 0);
    let input = ValidationInputBuilder::new(5).batch(2, b"two").build_arc();

    let err = spawner
        .create_execution_backend(&RecordingBackendBuilder::default(), hash(1), &input)
        .await
        .unwrap_err();

    assert!(matches!(err, ValidationError::SequencerMessage { number: 2, .. }));
    assert_eq!(log.live_clones(), 0);
}

#[tokio::test]
async fn load_and_builder_errors_propagate() {
    init_tracing();
    let log = Arc::new(MachineLog::default());
    let spawner = arbitrator(
        MockLoader::failing(MachineError::Unavailable(hash(3)), Arc::clone(&log)),
        0,
    );
    let input = ValidationInputBuilder::new(1).build_arc();
    let err = spawner
        .create_execution_backend(&RecordingBackendBuilder::default(), hash(3), &input)
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::Load { .. }));

    let spawner = arbitrator(MockLoader::new(MachineScript::default(), Arc::clone(&log)), 0);
    let err = spawner
        .create_execution_backend(&RecordingBackendBuilder { fail: true }, hash(3), &input)
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::Backend(_)));
    assert_eq!(log.live_clones(), 0);
}
