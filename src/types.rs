// src/types.rs

//! Value types shared by every layer: hashes, checkpoints and the replay
//! payload of a single validation request.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 32-byte hash (block hash, preimage key, module root).
///
/// Displays as `0x`-prefixed lowercase hex and parses with or without the
/// prefix.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bytes32(pub [u8; 32]);

/// Identifier selecting which build of the execution machine to load.
pub type ModuleRoot = Bytes32;

impl Bytes32 {
    pub const ZERO: Bytes32 = Bytes32([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Bytes32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Bytes32 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let mut out = [0u8; 32];
        hex::decode_to_slice(digits, &mut out)?;
        Ok(Self(out))
    }
}

impl Serialize for Bytes32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A position in the rollup's message stream plus the block hash reached
/// there. Used both as the pre-state of a validation and as its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block_hash: Bytes32,
    pub batch: u64,
    pub pos_in_batch: u64,
}

impl Checkpoint {
    pub fn new(block_hash: Bytes32, batch: u64, pos_in_batch: u64) -> Self {
        Self {
            block_hash,
            batch,
            pos_in_batch,
        }
    }
}

/// One sequencer batch: its number in the inbox and the raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInfo {
    pub number: u64,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// Everything needed to replay one block.
///
/// Built by the caller and shared read-only (usually as
/// `Arc<ValidationInput>`) with whichever spawner runs it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationInput {
    pub id: u64,
    pub start_state: Checkpoint,
    #[serde(default)]
    pub batch_info: Vec<BatchInfo>,
    #[serde(default)]
    pub has_delayed_msg: bool,
    #[serde(default)]
    pub delayed_msg_nr: u64,
    #[serde(default, with = "hex_bytes")]
    pub delayed_msg: Vec<u8>,
    /// Keyed by content hash; iterated in ascending hash order.
    #[serde(default, with = "hex_values")]
    pub preimages: BTreeMap<Bytes32, Vec<u8>>,
}

/// Serde helpers for byte payloads: hex strings, `0x` prefix optional on
/// input and never emitted.
fn decode_hex(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value))
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::decode_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// A map whose values are hex payloads.
mod hex_values {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};
    use serde::ser::SerializeMap;

    use super::Bytes32;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<Bytes32, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            out.serialize_entry(key, &hex::encode(value))?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Bytes32, Vec<u8>>, D::Error> {
        let raw = BTreeMap::<Bytes32, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| {
                super::decode_hex(&value)
                    .map(|bytes| (key, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
