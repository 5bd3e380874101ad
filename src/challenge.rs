// src/challenge.rs

//! Seeding the interactive bisection (challenge) protocol.
//!
//! The protocol itself lives elsewhere; this module only prepares its input:
//! a pristine machine with the block's inbox loaded, frozen so it can be
//! shared, plus the number of machines the protocol should keep around.

use std::sync::Arc;

use tracing::debug;

use crate::errors::{Result, ValidationError};
use crate::exec::load_entry_to_machine;
use crate::machine::{FrozenMachine, Machine, MachineLoader};
use crate::types::{ModuleRoot, ValidationInput};

/// Constructor of the external challenge backend.
pub trait ChallengeBackendBuilder<M: Machine> {
    type Backend;

    fn build(
        &self,
        initial_machine: FrozenMachine<M>,
        target_machine_count: usize,
    ) -> Result<Self::Backend>;
}

/// Build the initial snapshot for `input` and hand it to `builder`.
///
/// Loading and input-feeding errors are returned unchanged. The frozen
/// snapshot is owned by whatever the builder returns.
pub async fn create_execution_backend<L, B>(
    loader: &L,
    builder: &B,
    module_root: ModuleRoot,
    input: &Arc<ValidationInput>,
    target_machine_count: usize,
) -> Result<B::Backend>
where
    L: MachineLoader,
    B: ChallengeBackendBuilder<L::Machine>,
{
    let base = loader
        .zero_step_machine(module_root)
        .await
        .map_err(|source| ValidationError::Load {
            module_root,
            source,
        })?;

    let mut machine = <L::Machine as Clone>::clone(&base);
    drop(base);
    load_entry_to_machine(input, &mut machine)?;

    let frozen = FrozenMachine::freeze(machine);
    debug!(
        block = input.id,
        %module_root,
        target_machine_count,
        "seeding execution challenge backend"
    );
    builder.build(frozen, target_machine_count)
}
