//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, TagaaError};
use super::{Operation, WalEntry, WalReader};

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// LSN the next appended entry receives
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries written since the last fsync
    unsynced: usize,
    /// File length up to the end of the last successful append
    len: u64,
    /// Set when a failed append could not be rolled back
    broken: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// Existing entries are scanned so LSNs continue where the log left off.
    /// Callers are expected to have run recovery first, so the scan stops at
    /// the first invalid entry without complaint.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        let mut last_lsn = 0;
        let mut reader = WalReader::open(path)?;
        while let Ok(Some(entry)) = reader.next_entry() {
            last_lsn = entry.lsn;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            next_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            len,
            broken: false,
        })
    }

    /// Append one transaction's operations as a single entry
    ///
    /// Returns the LSN assigned to the entry. On error nothing of the entry
    /// remains in the file or in the write buffer.
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<u64> {
        if self.broken {
            return Err(TagaaError::Storage(format!(
                "WAL {} is unusable after a failed append",
                self.path.display()
            )));
        }

        let lsn = self.next_lsn;
        let frame = WalEntry::new(lsn, operations).serialize()?;

        if let Err(e) = self.write_frame(&frame) {
            if let Err(rollback) = self.discard_tail() {
                tracing::error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "could not roll back failed WAL append"
                );
                self.broken = true;
            }
            return Err(e);
        }

        self.len += frame.len() as u64;
        self.next_lsn += 1;
        Ok(lsn)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.writer.write_all(frame)?;
        self.writer.flush()?;
        self.unsynced += 1;

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if should_sync {
            self.sync()?;
        }
        Ok(())
    }

    /// Drop buffered bytes and cut the file back to the last good append
    fn discard_tail(&mut self) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        // into_parts hands back the buffer instead of flushing it
        let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
        let _ = stale.into_parts();

        let file = self.writer.get_ref();
        file.set_len(self.len)?;
        file.sync_all()?;
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Discard all entries (after their contents became durable elsewhere)
    ///
    /// LSNs keep increasing across truncations.
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_ref();
        file.set_len(0).map_err(|e| {
            TagaaError::Storage(format!("failed to truncate {}: {}", self.path.display(), e))
        })?;
        file.sync_all()?;
        self.unsynced = 0;
        self.len = 0;
        Ok(())
    }

    /// Get the LSN the next entry will receive
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
