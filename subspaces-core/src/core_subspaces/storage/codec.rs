//! Record encoding
//!
//! Records are stored with `bincode`; counters are stored as raw big-endian
//! integers so they can be inspected without the record types.

use super::super::errors::{SubspacesError, SubspacesResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<T: Serialize>(value: &T) -> SubspacesResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> SubspacesResult<T> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

pub fn decode_u64(bytes: &[u8]) -> SubspacesResult<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        SubspacesError::Serialization(format!("expected 8 counter bytes, got {}", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(raw))
}

pub fn encode_u32(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

pub fn decode_u32(bytes: &[u8]) -> SubspacesResult<u32> {
    let raw: [u8; 4] = bytes.try_into().map_err(|_| {
        SubspacesError::Serialization(format!("expected 4 counter bytes, got {}", bytes.len()))
    })?;
    Ok(u32::from_be_bytes(raw))
}
