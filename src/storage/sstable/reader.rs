//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups via in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use crate::error::{Result, TagaaError};
use crate::memtable::MemTableEntry;

use super::iterator::SSTableIterator;
use super::{le_u32, le_u64, FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Reader for SSTable files with in-memory index for O(log n) lookups
pub struct SSTableReader {
    path: PathBuf,
    pub(super) file: BufReader<File>,
    /// key → file offset
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
    pub(super) index_offset: u64,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Validates header and data checksum, then loads the index into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(path, "file shorter than header and footer"));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        if &header[0..4] != MAGIC {
            return Err(corrupt(path, format!("bad magic {:?}", &header[0..4])));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(corrupt(path, format!("unsupported version {}", version)));
        }
        let entry_count = le_u64(&header[6..14]);

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;
        let index_offset = le_u64(&footer[0..8]);
        let data_crc = le_u32(&footer[8..12]);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt(path, format!("index offset {} out of range", index_offset)));
        }

        // Verify the data block before trusting any offset in the index
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
        file.read_exact(&mut data)?;
        if crc32fast::hash(&data) != data_crc {
            return Err(corrupt(path, "data block checksum mismatch"));
        }
        drop(data);

        let mut index_data = vec![0u8; (file_size - FOOTER_SIZE - index_offset) as usize];
        file.read_exact(&mut index_data)?;
        let index = parse_index(path, &index_data)?;

        if index.len() as u64 != entry_count {
            return Err(corrupt(
                path,
                format!("header says {} entries, index has {}", entry_count, index.len()),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            index,
            entry_count,
            index_offset,
        })
    }

    /// Look up a key
    ///
    /// Returns:
    /// - `Ok(Some(Value))`: key found with value
    /// - `Ok(Some(Tombstone))`: key deleted as of this table
    /// - `Ok(None)`: key not in this table
    pub fn get(&mut self, key: &[u8]) -> Result<Option<MemTableEntry>> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Ok(None),
        };
        let (_, entry) = self.read_at(offset)?;
        Ok(Some(entry))
    }

    /// All entries whose key starts with `prefix`, in key order
    pub fn scan_prefix(&mut self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, MemTableEntry)>> {
        let offsets: Vec<u64> = self
            .index
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, &off)| off)
            .collect();

        offsets.into_iter().map(|off| self.read_at(off)).collect()
    }

    fn read_at(&mut self, offset: u64) -> Result<(Vec<u8>, MemTableEntry)> {
        self.file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;
        let key_len = le_u32(&header[0..4]) as usize;
        let val_len = le_u32(&header[4..8]);

        let mut key = vec![0u8; key_len];
        self.file.read_exact(&mut key)?;

        if val_len == TOMBSTONE_MARKER {
            return Ok((key, MemTableEntry::Tombstone));
        }
        let mut value = vec![0u8; val_len as usize];
        self.file.read_exact(&mut value)?;
        Ok((key, MemTableEntry::Value(value)))
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// False only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }

    /// Create an iterator over all entries (for compaction, debugging)
    pub fn iter(&mut self) -> Result<SSTableIterator<'_>> {
        SSTableIterator::new(&mut self.file, self.index_offset)
    }
}

/// Parse index entries: [key_len(4)][offset(8)][key]
fn parse_index(path: &Path, data: &[u8]) -> Result<BTreeMap<Vec<u8>, u64>> {
    let mut index = BTreeMap::new();
    let mut pos = 0;
    while pos < data.len() {
        if pos + 12 > data.len() {
            return Err(corrupt(path, "truncated index entry"));
        }
        let key_len = le_u32(&data[pos..]) as usize;
        let offset = le_u64(&data[pos + 4..]);
        pos += 12;
        let key = data
            .get(pos..pos + key_len)
            .ok_or_else(|| corrupt(path, "truncated index key"))?;
        index.insert(key.to_vec(), offset);
        pos += key_len;
    }
    Ok(index)
}

fn corrupt(path: &Path, reason: impl std::fmt::Display) -> TagaaError {
    TagaaError::Storage(format!("corrupt SSTable {}: {}", path.display(), reason))
}
