// src/machine/preimage.rs

use std::sync::Arc;

use crate::errors::{MachineError, MachineResult};
use crate::types::{Bytes32, ValidationInput};

/// Callback a machine uses to fetch preimages by hash.
pub type PreimageResolver = Arc<dyn Fn(Bytes32) -> MachineResult<Vec<u8>> + Send + Sync>;

/// Resolver backed only by the preimages carried in `input`.
///
/// There is no fallback: a hash missing from the input is
/// [`MachineError::PreimageNotFound`].
pub fn preimage_resolver(input: &Arc<ValidationInput>) -> PreimageResolver {
    let input = Arc::clone(input);
    Arc::new(move |hash: Bytes32| {
        input
            .preimages
            .get(&hash)
            .cloned()
            .ok_or(MachineError::PreimageNotFound(hash))
    })
}
