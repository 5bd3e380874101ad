// src/errors.rs

//! Crate-wide error types.
//!
//! - [`MachineError`] is what machine and loader collaborators report.
//! - [`ValidationError`] is what callers of this crate see; it wraps machine
//!   errors with the stage that produced them. It is `Clone` because a
//!   resolved run hands the same error to every reader.

use std::sync::Arc;

use thiserror::Error;

use crate::types::{Bytes32, ModuleRoot};

/// Failure reported by an execution machine or its loader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("preimage not found: {0}")]
    PreimageNotFound(Bytes32),

    #[error("machine rejected input: {0}")]
    Rejected(String),

    #[error("machine execution fault: {0}")]
    Fault(String),

    #[error("no machine available for module root {0}")]
    Unavailable(ModuleRoot),

    /// The loader itself is no longer usable (e.g. an out-of-process helper
    /// died). Reported on the fatal-error channel by the JIT spawner.
    #[error("machine backend crashed: {0}")]
    Crashed(String),
}

impl MachineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, MachineError::Crashed(_))
    }
}

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("unable to get WASM machine for module root {module_root}: {source}")]
    Load {
        module_root: ModuleRoot,
        #[source]
        source: MachineError,
    },

    #[error("unable to install preimage resolver: {0}")]
    PreimageResolver(#[source] MachineError),

    #[error("error while setting global state for proving: {0}")]
    SetGlobalState(#[source] MachineError),

    #[error(
        "error while trying to add sequencer msg {number} for proving (batch {batch}, block {block}): {source}"
    )]
    SequencerMessage {
        number: u64,
        batch: u64,
        block: u64,
        #[source]
        source: MachineError,
    },

    #[error("error while trying to add delayed msg {number} for proving (block {block}): {source}")]
    DelayedMessage {
        number: u64,
        block: u64,
        #[source]
        source: MachineError,
    },

    #[error("machine execution failed after {steps} steps: {source}")]
    Stepping {
        steps: u64,
        #[source]
        source: MachineError,
    },

    /// The machine stopped in its errored state: the claimed transition could
    /// not be reproduced.
    #[error("machine entered errored state during attempted validation of block {block}")]
    MachineFaulted { block: u64 },

    #[error("jit proving failed: {0}")]
    Prove(#[source] MachineError),

    #[error("not ready")]
    NotReady,

    #[error("validation cancelled: spawner stopped")]
    Cancelled,

    #[error("spawner not started")]
    NotStarted,

    #[error("wait for validation result cancelled")]
    WaitCancelled,

    #[error("validation task ended without producing a result")]
    RunAbandoned,

    #[error("challenge backend construction failed: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),
}

impl From<std::io::Error> for ValidationError {
    fn from(err: std::io::Error) -> Self {
        ValidationError::Io(Arc::new(err))
    }
}

impl From<toml::de::Error> for ValidationError {
    fn from(err: toml::de::Error) -> Self {
        ValidationError::Config(format!("TOML parsing error: {err}"))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ValidationError>;
pub type MachineResult<T> = std::result::Result<T, MachineError>;
