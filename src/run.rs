// src/run.rs

//! One-shot delivery of a validation result.
//!
//! [`new_run`] returns a producer/consumer pair. The background task that
//! owns the [`RunResolver`] publishes the outcome exactly once (resolving
//! consumes the resolver); any number of observers holding the
//! [`ValidationRun`] can poll, wait, and read the stored outcome afterwards.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::errors::{Result, ValidationError};
use crate::types::{Checkpoint, ModuleRoot};

/// What a finished run produced.
pub type RunOutcome = Result<Checkpoint>;

/// What a readiness receiver observes: `None` until the run resolves.
pub type RunSlot = Option<Arc<RunOutcome>>;

type Slot = RunSlot;

/// Create a pending run for `module_root` and the resolver that completes it.
pub fn new_run(module_root: ModuleRoot) -> (RunResolver, ValidationRun) {
    let (tx, rx) = watch::channel::<Slot>(None);
    (RunResolver { tx }, ValidationRun { module_root, rx })
}

/// Producer side. Only the task that owns the run holds this.
pub struct RunResolver {
    tx: watch::Sender<Slot>,
}

impl RunResolver {
    /// Publish the outcome and wake every waiter.
    pub fn resolve(self, outcome: RunOutcome) {
        self.tx.send_replace(Some(Arc::new(outcome)));
    }
}

/// Consumer side, returned by `launch`. Cheap to clone; all clones observe
/// the same outcome.
#[derive(Clone)]
pub struct ValidationRun {
    module_root: ModuleRoot,
    rx: watch::Receiver<Slot>,
}

impl fmt::Debug for ValidationRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRun")
            .field("module_root", &self.module_root)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl ValidationRun {
    pub fn module_root(&self) -> ModuleRoot {
        self.module_root
    }

    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// A fresh receiver on the run's readiness channel, for callers that
    /// select over many runs at once.
    pub fn ready_receiver(&self) -> watch::Receiver<RunSlot> {
        self.rx.clone()
    }

    /// Release this handle. Other clones and the execution are unaffected.
    pub fn close(self) {}

    /// Wait until the run resolves and return its error, if it failed.
    ///
    /// Returns [`ValidationError::RunAbandoned`] if the producing task went
    /// away without resolving.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.rx.clone();
        let slot = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ValidationError::RunAbandoned)?;
        match slot.as_deref() {
            Some(Ok(_)) => Ok(()),
            Some(Err(err)) => Err(err.clone()),
            None => Err(ValidationError::NotReady),
        }
    }

    /// Like [`wait_ready`](Self::wait_ready), but give up with
    /// [`ValidationError::WaitCancelled`] once `cancel` completes.
    ///
    /// Giving up does not affect the execution itself.
    pub async fn wait_ready_or<F>(&self, cancel: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            res = self.wait_ready() => res,
            _ = cancel => Err(ValidationError::WaitCancelled),
        }
    }

    pub async fn wait_ready_timeout(&self, timeout: Duration) -> Result<()> {
        self.wait_ready_or(tokio::time::sleep(timeout)).await
    }

    /// The resolved post-state, or [`ValidationError::NotReady`].
    pub fn result(&self) -> Result<Checkpoint> {
        match self.rx.borrow().as_deref() {
            Some(outcome) => outcome.clone(),
            None => Err(ValidationError::NotReady),
        }
    }
}
