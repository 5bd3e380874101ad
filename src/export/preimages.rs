// src/export/preimages.rs

//! `preimages.bin` record stream: for each preimage, its length as an 8-byte
//! little-endian integer followed by the raw bytes.

use std::collections::BTreeMap;
use std::io;

use crate::types::Bytes32;

const LEN_PREFIX: usize = 8;

/// Encode every preimage value, in ascending hash order.
pub fn encode_preimages(preimages: &BTreeMap<Bytes32, Vec<u8>>) -> Vec<u8> {
    let total = preimages
        .values()
        .map(|data| LEN_PREFIX + data.len())
        .sum();
    let mut out = Vec::with_capacity(total);
    for data in preimages.values() {
        out.extend_from_slice(&(data.len() as u64).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

/// Split a record stream back into its payloads.
pub fn decode_preimages(mut bytes: &[u8]) -> io::Result<Vec<Vec<u8>>> {
    let mut records = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < LEN_PREFIX {
            return Err(truncated("length prefix"));
        }
        let (prefix, rest) = bytes.split_at(LEN_PREFIX);
        let mut len_bytes = [0u8; LEN_PREFIX];
        len_bytes.copy_from_slice(prefix);
        let len = usize::try_from(u64::from_le_bytes(len_bytes))
            .map_err(|_| truncated("record"))?;
        if rest.len() < len {
            return Err(truncated("record"));
        }
        let (record, rest) = rest.split_at(len);
        records.push(record.to_vec());
        bytes = rest;
    }
    Ok(records)
}

fn truncated(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("preimage stream truncated inside {what}"),
    )
}
