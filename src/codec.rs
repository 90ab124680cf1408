//! Record Codec
//!
//! Turns [`Image`] and [`GroupRecord`] values into opaque byte blobs and back.
//!
//! ## Format
//! ```text
//! ┌─────────────┬──────────────────────────────┐
//! │ Version (1) │ bincode (fixed-int, LE)      │
//! └─────────────┴──────────────────────────────┘
//! ```
//! Trailing bytes after the record are rejected.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, TagaaError};
use crate::model::{GroupRecord, Image};

/// Leading byte of every encoded record
pub const RECORD_VERSION: u8 = 1;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    let mut buf = vec![RECORD_VERSION];
    options()
        .serialize_into(&mut buf, record)
        .map_err(|e| TagaaError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (&version, body) = bytes
        .split_first()
        .ok_or_else(|| TagaaError::DecodeError("empty record".to_string()))?;
    if version != RECORD_VERSION {
        return Err(TagaaError::DecodeError(format!(
            "unsupported record version {}",
            version
        )));
    }
    options()
        .deserialize(body)
        .map_err(|e| TagaaError::DecodeError(e.to_string()))
}

pub fn encode_image(image: &Image) -> Result<Vec<u8>> {
    encode(image)
}

pub fn decode_image(bytes: &[u8]) -> Result<Image> {
    decode(bytes)
}

pub fn encode_group(group: &GroupRecord) -> Result<Vec<u8>> {
    encode(group)
}

pub fn decode_group(bytes: &[u8]) -> Result<GroupRecord> {
    decode(bytes)
}
