// src/exec/mod.rs

//! Block replay on an execution machine.
//!
//! - [`execution_loop`] feeds a validation input into a cloned machine and
//!   steps it to completion, observing the owning spawner's stop signal.

pub mod execution_loop;

pub use execution_loop::{STEP_BUDGET, execute, load_entry_to_machine};
