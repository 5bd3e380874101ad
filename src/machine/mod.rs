// src/machine/mod.rs

//! Execution machine abstraction.
//!
//! The machine itself (instruction stepping, memory, WASM interpretation)
//! lives outside this crate. These traits describe the capabilities the
//! spawners rely on, so production code can plug in the real prover and
//! tests can plug in a scripted mock.
//!
//! Ownership model:
//! - a loader caches base machines and hands out `Arc<M>`; nobody mutates
//!   a base machine,
//! - a run calls `Clone` on the base to get its own instance, which is
//!   released by `Drop` on every exit path,
//! - [`FrozenMachine::freeze`] consumes an instance into an immutable
//!   snapshot that the caller owns from then on.

use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::MachineResult;
use crate::types::{Checkpoint, ModuleRoot, ValidationInput};

pub mod locator;
pub mod preimage;

pub use locator::MachineLocator;
pub use preimage::{PreimageResolver, preimage_resolver};

/// Boxed future returned by machine and loader operations.
pub type MachineFuture<'a, T> = Pin<Box<dyn Future<Output = MachineResult<T>> + Send + 'a>>;

/// A deterministic execution machine instance.
pub trait Machine: Clone + Send + Sync + 'static {
    fn set_preimage_resolver(&mut self, resolver: PreimageResolver) -> MachineResult<()>;

    fn set_global_state(&mut self, state: Checkpoint) -> MachineResult<()>;

    fn add_sequencer_inbox_message(&mut self, number: u64, data: &[u8]) -> MachineResult<()>;

    fn add_delayed_inbox_message(&mut self, number: u64, data: &[u8]) -> MachineResult<()>;

    /// Execute up to `count` steps. May suspend while the machine makes
    /// progress; dropping the future abandons the step.
    fn step(&mut self, count: u64) -> MachineFuture<'_, ()>;

    fn is_running(&self) -> bool;

    fn is_errored(&self) -> bool;

    fn global_state(&self) -> Checkpoint;
}

/// Resolves module roots to cached, fully initialised base machines.
pub trait MachineLoader: Send + Sync + 'static {
    type Machine: Machine;

    /// Base machine with host I/O wired up, used for block validation.
    fn host_io_machine(&self, module_root: ModuleRoot) -> MachineFuture<'_, Arc<Self::Machine>>;

    /// Pristine machine that has not executed a single step, used to seed
    /// challenge backends.
    fn zero_step_machine(&self, module_root: ModuleRoot)
    -> MachineFuture<'_, Arc<Self::Machine>>;
}

/// A JIT-compiled machine that replays a whole block in one call.
pub trait JitMachine: Send + Sync + 'static {
    fn prove<'a>(
        &'a self,
        input: &'a ValidationInput,
        resolver: PreimageResolver,
    ) -> MachineFuture<'a, Checkpoint>;
}

/// Settings a [`JitMachineLoader`] compiles machines with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitMachineConfig {
    /// Compile with Cranelift instead of LLVM.
    pub cranelift: bool,
    pub wasm_memory_usage_limit: u64,
}

impl Default for JitMachineConfig {
    fn default() -> Self {
        Self {
            cranelift: true,
            wasm_memory_usage_limit: 1 << 32,
        }
    }
}

/// Loader for [`JitMachine`]s. May own out-of-process helpers, hence
/// [`stop`](JitMachineLoader::stop).
pub trait JitMachineLoader: Send + Sync + 'static {
    type Machine: JitMachine;

    fn machine(&self, module_root: ModuleRoot) -> MachineFuture<'_, Arc<Self::Machine>>;

    fn stop(&self);
}

/// An immutable machine snapshot.
///
/// Cloning a `FrozenMachine` shares the snapshot; [`fork`](Self::fork)
/// produces a fresh mutable instance from it.
#[derive(Debug)]
pub struct FrozenMachine<M> {
    inner: Arc<M>,
}

impl<M: Machine> FrozenMachine<M> {
    pub fn freeze(machine: M) -> Self {
        Self {
            inner: Arc::new(machine),
        }
    }

    pub fn fork(&self) -> M {
        M::clone(&self.inner)
    }
}

impl<M> Clone for FrozenMachine<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> Deref for FrozenMachine<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.inner
    }
}
