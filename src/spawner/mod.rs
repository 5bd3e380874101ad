// src/spawner/mod.rs

//! Validation spawners.
//!
//! A spawner accepts launch requests, runs each one in its own background
//! task and hands back a [`ValidationRun`] to observe the result. Two
//! backends implement the same [`ValidationSpawner`] contract:
//!
//! - [`ArbitratorSpawner`] replays blocks step by step on the native
//!   interpreter and also exports reproduction bundles and seeds challenge
//!   backends.
//! - [`JitSpawner`] replays blocks on a JIT-compiled machine.
//!
//! Capacity is advisory: `launch` never checks [`room`](ValidationSpawner::room).
//! Balancing load across spawners is the orchestrator's job.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::run::ValidationRun;
use crate::types::{ModuleRoot, ValidationInput};

pub mod arbitrator;
pub mod jit;
pub mod lifecycle;

pub use arbitrator::ArbitratorSpawner;
pub use jit::{FatalErrorSender, JitSpawner};
pub use lifecycle::{Lifecycle, StopSignal};

/// Capability set consumed by an orchestrator.
pub trait ValidationSpawner: Send + Sync {
    /// Start validating `input` in the background. Never fails here; every
    /// failure is delivered through the returned run.
    fn launch(&self, input: Arc<ValidationInput>, module_root: ModuleRoot) -> ValidationRun;

    /// Idempotent.
    fn start(&self);

    fn stop(&self);

    /// Stable backend identifier.
    fn name(&self) -> &'static str;

    /// Advertised remaining capacity; may be negative.
    fn room(&self) -> i64;
}

/// Number of runs currently executing on a spawner.
///
/// Only ever touched through atomic increments and decrements.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicI64>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more run; the count drops again when the guard is dropped.
    pub fn enter(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(&self.0))
    }

    pub fn count(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicI64>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `limit - in_flight`, with a zero limit meaning host parallelism.
pub fn room(limit: usize, in_flight: &InFlight) -> i64 {
    let avail = if limit == 0 { host_parallelism() } else { limit };
    i64::try_from(avail).unwrap_or(i64::MAX) - in_flight.count()
}

pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
