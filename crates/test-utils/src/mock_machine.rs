use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use validation_spawner::challenge::ChallengeBackendBuilder;
use validation_spawner::errors::{MachineError, MachineResult, Result, ValidationError};
use validation_spawner::machine::{
    FrozenMachine, JitMachine, JitMachineLoader, Machine, MachineFuture, MachineLoader,
    PreimageResolver,
};
use validation_spawner::types::{Checkpoint, ModuleRoot, ValidationInput};

/// How a [`MockMachine`] behaves.
#[derive(Debug, Clone, Default)]
pub struct MachineScript {
    /// Successful step calls before the machine stops running. `0` means it
    /// is not running from the start.
    pub steps_until_halt: usize,
    /// 1-based step call that fails.
    pub fail_on_step: Option<usize>,
    /// Whether the machine reports the errored state once halted.
    pub errored_at_end: bool,
    /// Checkpoint reported once halted.
    pub final_state: Checkpoint,
    pub fail_global_state: bool,
    /// Batch number whose sequencer message is rejected.
    pub reject_sequencer: Option<u64>,
    pub reject_delayed: bool,
    /// Each step waits for one permit when set.
    pub step_gate: Option<Arc<Semaphore>>,
}

impl MachineScript {
    /// A machine that halts immediately with `state`.
    pub fn halted(state: Checkpoint) -> Self {
        Self {
            final_state: state,
            ..Self::default()
        }
    }
}

/// Operations observed by mock machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineCall {
    SetPreimageResolver,
    SetGlobalState(Checkpoint),
    SequencerMessage(u64, Vec<u8>),
    DelayedMessage(u64, Vec<u8>),
    Step(u64),
}

/// Shared record of everything mock machines did.
#[derive(Default)]
pub struct MachineLog {
    calls: Mutex<Vec<MachineCall>>,
    resolver: Mutex<Option<PreimageResolver>>,
    live_clones: AtomicI64,
    clones_made: AtomicUsize,
}

impl fmt::Debug for MachineLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineLog")
            .field("calls", &self.calls())
            .field("live_clones", &self.live_clones())
            .finish_non_exhaustive()
    }
}

impl MachineLog {
    pub fn calls(&self) -> Vec<MachineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn step_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MachineCall::Step(_)))
            .count()
    }

    pub fn saw_delayed_message(&self) -> bool {
        self.calls()
            .iter()
            .any(|c| matches!(c, MachineCall::DelayedMessage(..)))
    }

    /// The most recently installed preimage resolver.
    pub fn resolver(&self) -> Option<PreimageResolver> {
        self.resolver.lock().unwrap().clone()
    }

    /// Clones currently alive (base machines are not counted).
    pub fn live_clones(&self) -> i64 {
        self.live_clones.load(Ordering::SeqCst)
    }

    pub fn clones_made(&self) -> usize {
        self.clones_made.load(Ordering::SeqCst)
    }

    fn record(&self, call: MachineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Scripted [`Machine`] implementation.
///
/// Base machines come from [`MockMachine::new`]; every `clone` is counted in
/// the shared [`MachineLog`] until dropped.
#[derive(Debug)]
pub struct MockMachine {
    script: Arc<MachineScript>,
    log: Arc<MachineLog>,
    steps_taken: usize,
    running: bool,
    state: Checkpoint,
    is_clone: bool,
}

impl MockMachine {
    pub fn new(script: MachineScript, log: Arc<MachineLog>) -> Self {
        let running = script.steps_until_halt > 0;
        Self {
            script: Arc::new(script),
            log,
            steps_taken: 0,
            running,
            state: Checkpoint::default(),
            is_clone: false,
        }
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Start state installed by `set_global_state`.
    pub fn start_state(&self) -> Checkpoint {
        self.state
    }
}

impl Clone for MockMachine {
    fn clone(&self) -> Self {
        self.log.live_clones.fetch_add(1, Ordering::SeqCst);
        self.log.clones_made.fetch_add(1, Ordering::SeqCst);
        Self {
            script: Arc::clone(&self.script),
            log: Arc::clone(&self.log),
            steps_taken: self.steps_taken,
            running: self.running,
            state: self.state,
            is_clone: true,
        }
    }
}

impl Drop for MockMachine {
    fn drop(&mut self) {
        if self.is_clone {
            self.log.live_clones.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Machine for MockMachine {
    fn set_preimage_resolver(&mut self, resolver: PreimageResolver) -> MachineResult<()> {
        *self.log.resolver.lock().unwrap() = Some(resolver);
        self.log.record(MachineCall::SetPreimageResolver);
        Ok(())
    }

    fn set_global_state(&mut self, state: Checkpoint) -> MachineResult<()> {
        self.log.record(MachineCall::SetGlobalState(state));
        if self.script.fail_global_state {
            return Err(MachineError::Rejected("scripted global state failure".into()));
        }
        self.state = state;
        Ok(())
    }

    fn add_sequencer_inbox_message(&mut self, number: u64, data: &[u8]) -> MachineResult<()> {
        self.log
            .record(MachineCall::SequencerMessage(number, data.to_vec()));
        if self.script.reject_sequencer == Some(number) {
            return Err(MachineError::Rejected(format!("bad sequencer message {number}")));
        }
        Ok(())
    }

    fn add_delayed_inbox_message(&mut self, number: u64, data: &[u8]) -> MachineResult<()> {
        self.log.record(MachineCall::DelayedMessage(number, data.to_vec()));
        if self.script.reject_delayed {
            return Err(MachineError::Rejected(format!("bad delayed message {number}")));
        }
        Ok(())
    }

    fn step(&mut self, count: u64) -> MachineFuture<'_, ()> {
        Box::pin(async move {
            if let Some(gate) = self.script.step_gate.clone() {
                gate.acquire()
                    .await
                    .map_err(|_| MachineError::Fault("step gate closed".into()))?
                    .forget();
            }
            self.steps_taken += 1;
            self.log.record(MachineCall::Step(count));
            if self.script.fail_on_step == Some(self.steps_taken) {
                return Err(MachineError::Fault(format!(
                    "scripted failure on step call {}",
                    self.steps_taken
                )));
            }
            if self.steps_taken >= self.script.steps_until_halt {
                self.running = false;
            }
            Ok(())
        })
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_errored(&self) -> bool {
        !self.running && self.script.errored_at_end
    }

    fn global_state(&self) -> Checkpoint {
        self.script.final_state
    }
}

/// [`MachineLoader`] serving one scripted base machine per variant.
#[derive(Debug)]
pub struct MockLoader {
    host_io: Arc<MockMachine>,
    zero_step: Arc<MockMachine>,
    fail_with: Option<MachineError>,
    loads: AtomicUsize,
    requested: Mutex<Vec<ModuleRoot>>,
}

impl MockLoader {
    pub fn new(script: MachineScript, log: Arc<MachineLog>) -> Self {
        Self {
            host_io: Arc::new(MockMachine::new(script.clone(), Arc::clone(&log))),
            zero_step: Arc::new(MockMachine::new(script, log)),
            fail_with: None,
            loads: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: MachineError, log: Arc<MachineLog>) -> Self {
        Self {
            fail_with: Some(err),
            ..Self::new(MachineScript::default(), log)
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn requested_roots(&self) -> Vec<ModuleRoot> {
        self.requested.lock().unwrap().clone()
    }

    fn serve(
        &self,
        module_root: ModuleRoot,
        machine: &Arc<MockMachine>,
    ) -> MachineFuture<'_, Arc<MockMachine>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(module_root);
        let result = match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(Arc::clone(machine)),
        };
        Box::pin(async move { result })
    }
}

impl MachineLoader for MockLoader {
    type Machine = MockMachine;

    fn host_io_machine(&self, module_root: ModuleRoot) -> MachineFuture<'_, Arc<MockMachine>> {
        self.serve(module_root, &self.host_io)
    }

    fn zero_step_machine(&self, module_root: ModuleRoot) -> MachineFuture<'_, Arc<MockMachine>> {
        self.serve(module_root, &self.zero_step)
    }
}

/// [`JitMachine`] that returns a fixed outcome.
#[derive(Debug)]
pub struct MockJitMachine {
    outcome: MachineResult<Checkpoint>,
    gate: Option<Arc<Semaphore>>,
    proved: Mutex<Vec<u64>>,
}

impl MockJitMachine {
    pub fn proved_blocks(&self) -> Vec<u64> {
        self.proved.lock().unwrap().clone()
    }
}

impl JitMachine for MockJitMachine {
    fn prove<'a>(
        &'a self,
        input: &'a ValidationInput,
        resolver: PreimageResolver,
    ) -> MachineFuture<'a, Checkpoint> {
        Box::pin(async move {
            if let Some(gate) = &self.gate {
                gate.acquire()
                    .await
                    .map_err(|_| MachineError::Fault("prove gate closed".into()))?
                    .forget();
            }
            for hash in input.preimages.keys() {
                resolver(*hash)?;
            }
            self.proved.lock().unwrap().push(input.id);
            self.outcome.clone()
        })
    }
}

/// [`JitMachineLoader`] around a single [`MockJitMachine`].
#[derive(Debug)]
pub struct MockJitLoader {
    machine: Arc<MockJitMachine>,
    fail_with: Option<MachineError>,
    stopped: Arc<AtomicBool>,
}

impl MockJitLoader {
    pub fn new(outcome: MachineResult<Checkpoint>) -> Self {
        Self {
            machine: Arc::new(MockJitMachine {
                outcome,
                gate: None,
                proved: Mutex::new(Vec::new()),
            }),
            fail_with: None,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn gated(outcome: MachineResult<Checkpoint>, gate: Arc<Semaphore>) -> Self {
        let mut loader = Self::new(outcome);
        loader.machine = Arc::new(MockJitMachine {
            outcome: loader.machine.outcome.clone(),
            gate: Some(gate),
            proved: Mutex::new(Vec::new()),
        });
        loader
    }

    pub fn failing(err: MachineError) -> Self {
        Self {
            fail_with: Some(err),
            ..Self::new(Ok(Checkpoint::default()))
        }
    }

    pub fn machine(&self) -> Arc<MockJitMachine> {
        Arc::clone(&self.machine)
    }

    /// Flag set by [`JitMachineLoader::stop`]; stays readable after the
    /// loader is moved into a spawner.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped)
    }
}

impl JitMachineLoader for MockJitLoader {
    type Machine = MockJitMachine;

    fn machine(&self, _module_root: ModuleRoot) -> MachineFuture<'_, Arc<MockJitMachine>> {
        let result = match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(Arc::clone(&self.machine)),
        };
        Box::pin(async move { result })
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Frozen snapshot handed to a [`RecordingBackendBuilder`].
#[derive(Debug)]
pub struct RecordedBackend {
    pub initial_machine: FrozenMachine<MockMachine>,
    pub target_machine_count: usize,
}

/// [`ChallengeBackendBuilder`] that keeps what it was given.
#[derive(Debug, Default)]
pub struct RecordingBackendBuilder {
    pub fail: bool,
}

impl ChallengeBackendBuilder<MockMachine> for RecordingBackendBuilder {
    type Backend = RecordedBackend;

    fn build(
        &self,
        initial_machine: FrozenMachine<MockMachine>,
        target_machine_count: usize,
    ) -> Result<RecordedBackend> {
        if self.fail {
            return Err(ValidationError::Backend("scripted backend failure".into()));
        }
        Ok(RecordedBackend {
            initial_machine,
            target_machine_count,
        })
    }
}
