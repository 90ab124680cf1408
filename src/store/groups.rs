//! Engine-backed implementation of [`ImageStore`].

use std::path::Path;

use bytes::Bytes;
use chrono::Utc;

use crate::codec::{decode_group, decode_image, encode_group, encode_image};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, TagaaError};
use crate::keys::{
    blob_key, bytes_to_id, group_key, id_to_bytes, image_key, image_key_parts, image_prefix,
    validate_group_name, validate_hash, GROUP_NS, GROUP_ORDER_KEY,
};
use crate::model::{Group, GroupRecord, Image};
use crate::txn::{KvRead, WriteTxn};

use super::ImageStore;

/// Group store on top of the embedded engine
///
/// Shareable across threads (`Arc<GroupStore>`); mutations are serialized by
/// the engine's single writer.
pub struct GroupStore {
    engine: Engine,
}

impl GroupStore {
    /// Open or create the store described by `config`
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self {
            engine: Engine::open(config)?,
        })
    }

    /// Open or create a store in `path` with default settings
    pub fn open_path(path: &Path) -> Result<Self> {
        Ok(Self {
            engine: Engine::open_path(path)?,
        })
    }

    /// The underlying engine (maintenance and inspection)
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn close(self) -> Result<()> {
        self.engine.close()
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

fn load_group(tx: &impl KvRead, name: &str) -> Result<Option<GroupRecord>> {
    tx.get(&group_key(name))?
        .map(|bytes| decode_group(&bytes))
        .transpose()
}

fn load_image(tx: &impl KvRead, group: &str, id: u64) -> Result<Option<Image>> {
    tx.get(&image_key(group, id))?
        .map(|bytes| decode_image(&bytes))
        .transpose()
}

fn save_group(tx: &mut WriteTxn<'_>, group: &GroupRecord) -> Result<()> {
    tx.put(group_key(&group.name), encode_group(group)?);
    Ok(())
}

fn save_image(tx: &mut WriteTxn<'_>, group: &str, image: &Image) -> Result<()> {
    tx.put(image_key(group, image.id), encode_image(image)?);
    Ok(())
}

/// Insert a fresh, empty group record
fn new_group(tx: &mut WriteTxn<'_>, name: &str) -> Result<GroupRecord> {
    let order = match tx.get(GROUP_ORDER_KEY)? {
        Some(bytes) => bytes_to_id(&bytes).ok_or_else(|| {
            TagaaError::DecodeError(format!("group order counter is {} bytes", bytes.len()))
        })?,
        None => 0,
    } + 1;
    tx.put(GROUP_ORDER_KEY, id_to_bytes(order));

    let group = GroupRecord::new(name, order);
    save_group(tx, &group)?;
    Ok(group)
}

impl ImageStore for GroupStore {
    fn create_group(&self, name: &str) -> Result<()> {
        validate_group_name(name)?;
        self.engine.update(|tx| {
            if load_group(tx, name)?.is_some() {
                return Err(TagaaError::GroupExists);
            }
            new_group(tx, name)?;
            Ok(())
        })
    }

    fn delete_group(&self, name: &str) -> Result<()> {
        validate_group_name(name)?;
        self.engine.update(|tx| {
            let group = load_group(tx, name)?.ok_or(TagaaError::GroupNotFound)?;
            if !group.images.is_empty() {
                return Err(TagaaError::GroupNotEmpty);
            }
            tx.delete(group_key(name));
            Ok(())
        })
    }

    fn get_group(&self, name: &str) -> Result<Group> {
        validate_group_name(name)?;
        self.engine.view(|tx| {
            load_group(tx, name)?
                .map(|g| g.to_group())
                .ok_or(TagaaError::NotFound)
        })
    }

    fn get_all_groups(&self) -> Result<Vec<Group>> {
        let mut records = self.engine.view(|tx| {
            tx.scan_prefix(&[GROUP_NS])?
                .iter()
                .map(|(_, bytes)| decode_group(bytes))
                .collect::<Result<Vec<_>>>()
        })?;
        records.sort_by_key(|g| g.order);
        Ok(records.iter().map(GroupRecord::to_group).collect())
    }

    fn get_group_images(&self, name: &str) -> Result<Vec<Image>> {
        validate_group_name(name)?;
        self.engine.view(|tx| {
            if load_group(tx, name)?.is_none() {
                return Err(TagaaError::GroupNotFound);
            }
            tx.scan_prefix(&image_prefix(name))?
                .iter()
                .map(|(key, bytes)| -> Result<Image> {
                    let image = decode_image(bytes)?;
                    match image_key_parts(key) {
                        Some((_, id)) if id == image.id => Ok(image),
                        _ => Err(TagaaError::DecodeError(format!(
                            "image record {} stored under a mismatched key",
                            image.id
                        ))),
                    }
                })
                .collect()
        })
    }

    fn add_image(&self, group: &str, image: &mut Image) -> Result<()> {
        validate_group_name(group)?;
        let stored = self.engine.update(|tx| {
            let mut record = match load_group(tx, group)? {
                Some(record) => record,
                None => new_group(tx, group)?,
            };

            let id = record.last_id + 1;
            let stored = Image {
                id,
                added: Some(Utc::now()),
                updated: None,
                ..image.clone()
            };
            save_image(tx, group, &stored)?;

            record.last_id = id;
            record.images.push(id);
            record.size = record.size.saturating_add(stored.size);
            save_group(tx, &record)?;

            Ok(stored)
        })?;

        *image = stored;
        Ok(())
    }

    fn update_image(&self, group: &str, image: &mut Image) -> Result<()> {
        validate_group_name(group)?;
        let stored = self.engine.update(|tx| {
            let mut record = load_group(tx, group)?.ok_or(TagaaError::GroupNotFound)?;
            let old = load_image(tx, group, image.id)?.ok_or(TagaaError::ImageNotFound)?;

            // Never step backwards if the clock does
            let now = Utc::now();
            let updated = old.updated.map_or(now, |prev| prev.max(now));

            let stored = Image {
                id: old.id,
                added: old.added,
                updated: Some(updated),
                ..image.clone()
            };
            save_image(tx, group, &stored)?;

            record.size = record.size.saturating_sub(old.size).saturating_add(stored.size);
            save_group(tx, &record)?;

            Ok(stored)
        })?;

        *image = stored;
        Ok(())
    }

    fn delete_image(&self, group: &str, id: u64) -> Result<()> {
        validate_group_name(group)?;
        self.engine.update(|tx| {
            let mut record = load_group(tx, group)?.ok_or(TagaaError::GroupNotFound)?;
            let old = load_image(tx, group, id)?.ok_or(TagaaError::ImageNotFound)?;

            tx.delete(image_key(group, id));
            record.images.retain(|&existing| existing != id);
            record.size = record.size.saturating_sub(old.size);
            save_group(tx, &record)
        })
    }

    fn get_image(&self, group: &str, id: u64) -> Result<Image> {
        validate_group_name(group)?;
        self.engine.view(|tx| {
            if load_group(tx, group)?.is_none() {
                return Err(TagaaError::GroupNotFound);
            }
            load_image(tx, group, id)?.ok_or(TagaaError::ImageNotFound)
        })
    }

    fn get_image_data(&self, hash: &str) -> Result<Bytes> {
        validate_hash(hash)?;
        self.engine.view(|tx| {
            tx.get(&blob_key(hash))?
                .map(Bytes::from)
                .ok_or(TagaaError::NotFound)
        })
    }

    fn put_image_data(&self, hash: &str, data: &[u8]) -> Result<()> {
        validate_hash(hash)?;
        self.engine.update(|tx| {
            tx.put(blob_key(hash), data);
            Ok(())
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        GroupStore::close(*self)
    }
}
