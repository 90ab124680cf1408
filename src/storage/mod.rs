//! Storage Module
//!
//! Persistent sorted storage for flushed MemTables.
//!
//! ## Responsibilities
//! - Persist committed data to disk in sorted, immutable tables
//! - Point lookups and prefix scans across all tables (newest wins)
//! - Full compaction once too many tables accumulate
//!
//! See [`sstable`] for the file layout.

pub mod sstable;
mod manager;

pub use sstable::{SSTable, SSTableBuilder, SSTableIterator, SSTableReader};
pub use manager::StorageManager;
