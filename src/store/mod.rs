//! Store Module
//!
//! The grouped image-metadata store and the interface callers program
//! against.
//!
//! ## Responsibilities
//! - Group lifecycle: create, delete (only when empty), list
//! - Per-group image ID allocation (never reused)
//! - Image CRUD scoped to a group
//! - Content-addressed blob retrieval
//!
//! Every operation is one engine transaction: mutations go through
//! `Engine::update`, reads through `Engine::view`.

mod groups;

use bytes::Bytes;

use crate::error::Result;
use crate::model::{Group, Image};

pub use groups::GroupStore;

/// Operations a backing engine must provide to the CLI/web layer
///
/// Errors are [`TagaaError`](crate::TagaaError) kinds so callers can branch
/// on `GroupNotFound`, `GroupExists`, `GroupNotEmpty`, `ImageNotFound`, ...
pub trait ImageStore: Send + Sync {
    /// Create an empty group. Fails with `GroupExists` if the name is taken.
    fn create_group(&self, name: &str) -> Result<()>;

    /// Delete an empty group. Fails with `GroupNotFound` or `GroupNotEmpty`.
    fn delete_group(&self, name: &str) -> Result<()>;

    /// Current summary of one group. Fails with `NotFound`.
    fn get_group(&self, name: &str) -> Result<Group>;

    /// Every group in creation order; empty when there are none.
    fn get_all_groups(&self) -> Result<Vec<Group>>;

    /// All images of a group in ID order. Fails with `GroupNotFound`.
    fn get_group_images(&self, name: &str) -> Result<Vec<Image>>;

    /// Store `image` in `group`, creating the group if it does not exist.
    ///
    /// On success `image.id` and `image.added` hold the values assigned by
    /// the store.
    fn add_image(&self, group: &str, image: &mut Image) -> Result<()>;

    /// Replace the stored image with ID `image.id`.
    ///
    /// Keeps the stored `id` and `added`, stamps `updated`. Fails with
    /// `GroupNotFound`, then `ImageNotFound`.
    fn update_image(&self, group: &str, image: &mut Image) -> Result<()>;

    /// Remove one image. Fails with `GroupNotFound`, then `ImageNotFound`.
    fn delete_image(&self, group: &str, id: u64) -> Result<()>;

    /// Fails with `GroupNotFound`, then `ImageNotFound`.
    fn get_image(&self, group: &str, id: u64) -> Result<Image>;

    /// Blob stored under `hash`. Fails with `NotFound`.
    fn get_image_data(&self, hash: &str) -> Result<Bytes>;

    /// Store (or replace) the blob under `hash`.
    fn put_image_data(&self, hash: &str, data: &[u8]) -> Result<()>;

    /// Flush and release the backing store.
    fn close(self: Box<Self>) -> Result<()>;
}
