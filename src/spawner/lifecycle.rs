// src/spawner/lifecycle.rs

//! Start/stop state shared by a spawner and the tasks it launches.
//!
//! A spawner is constructed idle. `start` binds it to the current tokio
//! runtime and creates a stop signal; every task launched afterwards gets a
//! [`StopSignal`] clone. `stop` fires the signal once; a stopped lifecycle
//! cannot be restarted.

use std::sync::Mutex;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::{Result, ValidationError};

/// Cancellation signal handed to background tasks.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl StopSignal {
    /// A signal that never fires, for callers running outside a spawner.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_stopped(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the owning lifecycle is stopped (or dropped).
    pub async fn stopped(&mut self) {
        match self.rx.as_mut() {
            Some(rx) => {
                let _ = rx.wait_for(|stopped| *stopped).await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

enum State {
    Idle,
    Running {
        handle: Handle,
        stop_tx: watch::Sender<bool>,
    },
    Stopped,
}

pub struct Lifecycle {
    name: &'static str,
    state: Mutex<State>,
}

impl Lifecycle {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State::Idle),
        }
    }

    /// Start on the ambient tokio runtime. No-op if already started.
    pub fn start(&self) {
        match Handle::try_current() {
            Ok(handle) => self.start_on(handle),
            Err(err) => warn!(
                spawner = self.name,
                error = %err,
                "start called outside a tokio runtime; spawner stays idle"
            ),
        }
    }

    pub fn start_on(&self, handle: Handle) {
        let mut state = self.lock();
        match *state {
            State::Idle => {
                let (stop_tx, _) = watch::channel(false);
                *state = State::Running { handle, stop_tx };
                info!(spawner = self.name, "spawner started");
            }
            State::Running { .. } => debug!(spawner = self.name, "spawner already started"),
            State::Stopped => warn!(spawner = self.name, "spawner already stopped; not restarting"),
        }
    }

    /// Fire the stop signal. Tasks observe it at their next suspension point.
    pub fn stop(&self) {
        let mut state = self.lock();
        if let State::Running { stop_tx, .. } = &*state {
            stop_tx.send_replace(true);
            info!(spawner = self.name, "spawner stopped");
        }
        *state = State::Stopped;
    }

    pub fn is_started(&self) -> bool {
        matches!(*self.lock(), State::Running { .. })
    }

    /// Runtime handle and stop signal for a new background task.
    ///
    /// Fails with [`ValidationError::NotStarted`] before `start` and with
    /// [`ValidationError::Cancelled`] after `stop`.
    pub fn task_context(&self) -> Result<(Handle, StopSignal)> {
        match &*self.lock() {
            State::Running { handle, stop_tx } => Ok((
                handle.clone(),
                StopSignal {
                    rx: Some(stop_tx.subscribe()),
                },
            )),
            State::Idle => Err(ValidationError::NotStarted),
            State::Stopped => Err(ValidationError::Cancelled),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
