#![allow(dead_code)]

use std::sync::Arc;

use validation_spawner::types::{BatchInfo, Bytes32, Checkpoint, ValidationInput};

/// Hash made of one repeated byte; handy for readable fixtures.
pub fn hash(byte: u8) -> Bytes32 {
    Bytes32::new([byte; 32])
}

/// Builder for `ValidationInput` to simplify test setup.
pub struct ValidationInputBuilder {
    input: ValidationInput,
}

impl ValidationInputBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            input: ValidationInput {
                id,
                ..ValidationInput::default()
            },
        }
    }

    pub fn start_state(mut self, block_hash: Bytes32, batch: u64, pos_in_batch: u64) -> Self {
        self.input.start_state = Checkpoint::new(block_hash, batch, pos_in_batch);
        self
    }

    pub fn batch(mut self, number: u64, data: &[u8]) -> Self {
        self.input.batch_info.push(BatchInfo {
            number,
            data: data.to_vec(),
        });
        self
    }

    pub fn delayed(mut self, number: u64, data: &[u8]) -> Self {
        self.input.has_delayed_msg = true;
        self.input.delayed_msg_nr = number;
        self.input.delayed_msg = data.to_vec();
        self
    }

    pub fn preimage(mut self, key: Bytes32, data: &[u8]) -> Self {
        self.input.preimages.insert(key, data.to_vec());
        self
    }

    pub fn build(self) -> ValidationInput {
        self.input
    }

    pub fn build_arc(self) -> Arc<ValidationInput> {
        Arc::new(self.input)
    }
}
