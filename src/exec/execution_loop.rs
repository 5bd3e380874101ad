// src/exec/execution_loop.rs

//! Replays one block on a cloned machine.

use std::sync::Arc;

use tracing::{debug, error};

use crate::errors::{Result, ValidationError};
use crate::machine::{Machine, MachineLoader, preimage_resolver};
use crate::spawner::lifecycle::StopSignal;
use crate::types::{Checkpoint, ModuleRoot, ValidationInput};

/// Steps requested from the machine per loop iteration.
pub const STEP_BUDGET: u64 = 500_000_000;

/// Install the preimage resolver, set the start state and feed every inbox
/// message of `input` into `mach`.
///
/// Batch messages go in input order; the delayed message, if any, goes last.
pub fn load_entry_to_machine<M: Machine>(input: &Arc<ValidationInput>, mach: &mut M) -> Result<()> {
    mach.set_preimage_resolver(preimage_resolver(input))
        .map_err(ValidationError::PreimageResolver)?;

    if let Err(err) = mach.set_global_state(input.start_state) {
        error!(
            error = %err,
            gs_start = ?input.start_state,
            "error while setting global state for proving"
        );
        return Err(ValidationError::SetGlobalState(err));
    }

    for batch in &input.batch_info {
        if let Err(err) = mach.add_sequencer_inbox_message(batch.number, &batch.data) {
            error!(
                error = %err,
                seq = input.start_state.batch,
                block = input.id,
                "error while trying to add sequencer msg for proving"
            );
            return Err(ValidationError::SequencerMessage {
                number: batch.number,
                batch: input.start_state.batch,
                block: input.id,
                source: err,
            });
        }
    }

    if input.has_delayed_msg {
        if let Err(err) = mach.add_delayed_inbox_message(input.delayed_msg_nr, &input.delayed_msg) {
            error!(
                error = %err,
                seq = input.delayed_msg_nr,
                block = input.id,
                "error while trying to add delayed msg for proving"
            );
            return Err(ValidationError::DelayedMessage {
                number: input.delayed_msg_nr,
                block: input.id,
                source: err,
            });
        }
    }

    Ok(())
}

/// Validate `input` against the machine built for `module_root`.
///
/// Terminates in exactly one of:
/// - the machine stops cleanly: its final checkpoint,
/// - the machine stops in its errored state: [`ValidationError::MachineFaulted`],
/// - a step call fails: [`ValidationError::Stepping`],
/// - `stop` fires mid-step: [`ValidationError::Cancelled`].
///
/// The cloned instance is dropped on every path; the loader's base machine
/// is never mutated.
pub async fn execute<L: MachineLoader>(
    loader: &L,
    input: &Arc<ValidationInput>,
    module_root: ModuleRoot,
    mut stop: StopSignal,
) -> Result<Checkpoint> {
    let base = loader
        .host_io_machine(module_root)
        .await
        .map_err(|source| ValidationError::Load {
            module_root,
            source,
        })?;

    let mut mach = <L::Machine as Clone>::clone(&base);
    drop(base);

    load_entry_to_machine(input, &mut mach)?;

    let mut steps: u64 = 0;
    while mach.is_running() {
        if steps > 0 {
            debug!(%module_root, block = input.id, steps, "validation");
        }
        tokio::select! {
            biased;
            _ = stop.stopped() => {
                debug!(%module_root, block = input.id, steps, "validation cancelled mid-step");
                return Err(ValidationError::Cancelled);
            }
            res = mach.step(STEP_BUDGET) => {
                if let Err(source) = res {
                    return Err(ValidationError::Stepping { steps, source });
                }
            }
        }
        steps = steps.saturating_add(STEP_BUDGET);
    }

    if mach.is_errored() {
        error!(block = input.id, "machine entered errored state during attempted validation");
        return Err(ValidationError::MachineFaulted { block: input.id });
    }

    Ok(mach.global_state())
}
