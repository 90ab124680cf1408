//! Storage Manager
//!
//! Manages multiple SSTables and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from MemTable flushes
//! - Merge all SSTables into one during compaction
//!
//! ## Compaction marker
//! After a compaction has written its output, `COMPACTED` records the ID the
//! compaction reserved. Every table with a lower ID was merged into that
//! output, so tables left behind by an interrupted cleanup are deleted on
//! the next open instead of resurrecting keys the merge dropped.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Result, TagaaError};
use crate::memtable::{MemTable, MemTableEntry};

use super::{SSTable, SSTableBuilder, SSTableReader};

const COMPACTION_MARKER: &str = "COMPACTED";

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: Protected by RwLock; lookups take it exclusively because
///   `SSTableReader` seeks its file handle
/// - `next_sstable_id`: Atomic counter
pub struct StorageManager {
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<SSTableReader>>,

    next_sstable_id: AtomicU64,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// Leftover `*.tmp` files from an interrupted flush are removed.
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let compacted_through = Self::read_compaction_marker(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if !file_path.is_file() {
                continue;
            }
            if file_path.extension().is_some_and(|ext| ext == "tmp") {
                tracing::warn!(path = %file_path.display(), "removing unfinished SSTable");
                fs::remove_file(&file_path)?;
            } else if let Some(id) = Self::parse_sstable_id(&file_path) {
                if compacted_through.is_some_and(|through| id < through) {
                    tracing::warn!(path = %file_path.display(), "removing already compacted SSTable");
                    fs::remove_file(&file_path)?;
                } else {
                    sstable_ids.push(id);
                }
            }
        }

        // Newest first
        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let sstables = sstable_ids
            .iter()
            .map(|&id| SSTableReader::open(&Self::sstable_path_with_dir(path, id)))
            .collect::<Result<Vec<_>>>()?;

        let next_id = sstable_ids
            .first()
            .copied()
            .max(compacted_through)
            .map_or(1, |id| id + 1);
        tracing::debug!(count = sstables.len(), next_id, "loaded SSTables");

        Ok(Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(sstables),
            next_sstable_id: AtomicU64::new(next_id),
        })
    }

    /// Look a key up in the newest table that knows about it
    ///
    /// `Ok(None)` means no table has the key; a deletion shows up as
    /// `Some(Tombstone)` so callers stop searching.
    pub fn get(&self, key: &[u8]) -> Result<Option<MemTableEntry>> {
        let mut sstables = self.sstables.write();
        for reader in sstables.iter_mut() {
            if !reader.might_contain(key) {
                continue;
            }
            if let Some(entry) = reader.get(key)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Merge the prefix range of every table; newer tables shadow older ones
    ///
    /// Tombstones are kept so the caller can overlay them on its own view.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<BTreeMap<Vec<u8>, MemTableEntry>> {
        let mut merged = BTreeMap::new();
        let mut sstables = self.sstables.write();
        for reader in sstables.iter_mut().rev() {
            for (key, entry) in reader.scan_prefix(prefix)? {
                merged.insert(key, entry);
            }
        }
        Ok(merged)
    }

    /// Flush a MemTable to a new SSTable
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(TagaaError::Storage(
                "Cannot flush empty MemTable".to_string(),
            ));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let mut builder = SSTableBuilder::new(&path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(&key, &v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        let metadata = builder.finish()?;
        let reader = SSTableReader::open(&path)?;

        self.sstables.write().insert(0, reader);
        tracing::debug!(
            path = %metadata.path.display(),
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "flushed memtable"
        );

        Ok(metadata)
    }

    /// Merge every SSTable into a single one, dropping tombstones
    ///
    /// Only valid when no older data exists outside these tables, which holds
    /// because the store is the sole owner of its directory. Returns the new
    /// table, or `None` when nothing live remained.
    pub fn compact(&self) -> Result<Option<SSTable>> {
        let mut sstables = self.sstables.write();
        if sstables.len() < 2 {
            return Ok(None);
        }

        // Oldest first so newer values overwrite
        let mut live: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
        for reader in sstables.iter_mut().rev() {
            for item in reader.iter()? {
                let (key, value) = item?;
                live.insert(key, value);
            }
        }

        let old_paths: Vec<PathBuf> = sstables.iter().map(|r| r.path().to_path_buf()).collect();

        // Reserved even when nothing live remains, so the marker can name it
        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);

        let mut metadata = None;
        let mut readers = Vec::new();
        if live.values().any(Option::is_some) {
            let path = self.sstable_path(id);
            let mut builder = SSTableBuilder::new(&path)?;
            for (key, value) in &live {
                if let Some(v) = value {
                    builder.add(key, v)?;
                }
            }
            metadata = Some(builder.finish()?);
            readers.push(SSTableReader::open(&path)?);
        }

        self.write_compaction_marker(id)?;

        *sstables = readers;
        // Oldest first: a surviving newer table can only shadow, never resurrect
        for path in old_paths.iter().rev() {
            fs::remove_file(path)?;
        }

        tracing::info!(
            merged = old_paths.len(),
            entries = metadata.as_ref().map_or(0, SSTable::entry_count),
            "compacted SSTables"
        );

        Ok(metadata)
    }

    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_compaction_marker(&self, id: u64) -> Result<()> {
        let path = self.data_dir.join(COMPACTION_MARKER);
        let tmp_path = SSTableBuilder::tmp_path_for(&path);
        fs::write(&tmp_path, id.to_string())?;
        File::open(&tmp_path)?.sync_all()?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// ID of the last compaction output; tables below it are stale
    fn read_compaction_marker(dir: &Path) -> Result<Option<u64>> {
        let path = dir.join(COMPACTION_MARKER);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        contents.trim().parse().map(Some).map_err(|_| {
            TagaaError::Storage(format!(
                "corrupt compaction marker {}: {:?}",
                path.display(),
                contents
            ))
        })
    }

    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix("sstable_")?.parse().ok()
    }
}
