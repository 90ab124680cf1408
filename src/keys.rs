//! Key Encoding
//!
//! Maps logical identifiers onto the engine's single sorted key space.
//!
//! ## Layout
//! ```text
//! g <name>                  group record
//! i <name> 0x00 <id: u64 BE> image record
//! b <hash>                  content-addressed blob
//! m <name>                  store metadata
//! ```
//!
//! Group names are rejected (never escaped) if they are empty, longer than
//! [`MAX_GROUP_NAME_LEN`] bytes, or contain NUL. With NUL excluded, the
//! image prefix `i <name> 0x00` of one group can never be a prefix of
//! another group's keys, and big-endian IDs keep a group's images in
//! numeric order.

use crate::error::{Result, TagaaError};

pub const GROUP_NS: u8 = b'g';
pub const IMAGE_NS: u8 = b'i';
pub const BLOB_NS: u8 = b'b';
pub const META_NS: u8 = b'm';

pub const MAX_GROUP_NAME_LEN: usize = 1024;

const NAME_TERMINATOR: u8 = 0x00;

/// Metadata key holding the last group creation order handed out
pub const GROUP_ORDER_KEY: &[u8] = b"mgroup_order";

pub fn validate_group_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TagaaError::InvalidGroupName("name is empty".to_string()));
    }
    if name.len() > MAX_GROUP_NAME_LEN {
        return Err(TagaaError::InvalidGroupName(format!(
            "name is {} bytes, limit is {}",
            name.len(),
            MAX_GROUP_NAME_LEN
        )));
    }
    if name.as_bytes().contains(&NAME_TERMINATOR) {
        return Err(TagaaError::InvalidGroupName(format!(
            "{:?} contains a NUL character",
            name
        )));
    }
    Ok(())
}

pub fn group_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + name.len());
    key.push(GROUP_NS);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Prefix shared by every image key of `group`
pub fn image_prefix(group: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + group.len() + 8);
    key.push(IMAGE_NS);
    key.extend_from_slice(group.as_bytes());
    key.push(NAME_TERMINATOR);
    key
}

pub fn image_key(group: &str, id: u64) -> Vec<u8> {
    let mut key = image_prefix(group);
    key.extend_from_slice(&id_to_bytes(id));
    key
}

/// Split an image key back into (group, id)
pub fn image_key_parts(key: &[u8]) -> Option<(&str, u64)> {
    let rest = key.strip_prefix(&[IMAGE_NS])?;
    if rest.len() < 9 {
        return None;
    }
    let (name, tail) = rest.split_at(rest.len() - 9);
    if tail[0] != NAME_TERMINATOR {
        return None;
    }
    let name = std::str::from_utf8(name).ok()?;
    Some((name, bytes_to_id(&tail[1..])?))
}

pub fn validate_hash(hash: &str) -> Result<()> {
    if hash.is_empty() {
        return Err(TagaaError::InvalidHash("hash is empty".to_string()));
    }
    Ok(())
}

pub fn blob_key(hash: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + hash.len());
    key.push(BLOB_NS);
    key.extend_from_slice(hash.as_bytes());
    key
}

/// 8-byte big-endian representation of `id`
pub fn id_to_bytes(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

pub fn bytes_to_id(bytes: &[u8]) -> Option<u64> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(arr))
}
