//! Engine Module
//!
//! The sorted key-value engine underneath the group store.
//!
//! ## Responsibilities
//! - Own the data directory and its exclusive lock
//! - Coordinate WAL, MemTable, and Storage
//! - Run read-only views and read-write transactions
//! - Trigger flushes and compactions
//! - Manage crash recovery on startup

use std::fs::{self, File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{Result, TagaaError};
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::StorageManager;
use crate::txn::{KvRead, ReadTxn, WriteTxn};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Poll interval while waiting for another process to release the lock
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// The storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Transactions** (`update`): serialized by `write_lock` for their whole
///   duration. Writes are buffered in the transaction and committed as one
///   WAL entry followed by one MemTable batch.
/// - **Views** (`view`): hold `commit_gate` shared. Commits, flushes and
///   compactions take it exclusively, so a view never observes half of a
///   commit or a table moving between MemTable and SSTables.
///
/// Lock order: write_lock → commit_gate → (wal | memtable | sstables).
/// Calling `update` from inside `view` deadlocks.
pub struct Engine {
    config: Config,

    storage_dir: PathBuf,

    wal: Mutex<WalWriter>,

    memtable: MemTable,

    storage: StorageManager,

    write_lock: Mutex<()>,

    commit_gate: RwLock<()>,

    /// Held (and flock'ed) for the engine's lifetime
    lock_file: File,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const LOCK_FILENAME: &'static str = "LOCK";
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory and take its exclusive lock
    /// 2. Load existing SSTables
    /// 3. Replay committed transactions from the WAL and flush them
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let lock_file = Self::acquire_lock(
            &config.data_dir.join(Self::LOCK_FILENAME),
            config.open_timeout,
        )?;

        let storage_dir = config.data_dir.join(Self::SSTABLE_DIR);
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);

        let storage = StorageManager::open(&storage_dir)?;
        let memtable = MemTable::new();

        let mut replayed = false;
        if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;
            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                tracing::info!(
                    recovered = result.entries_recovered,
                    corrupted = result.entries_corrupted,
                    last_lsn = result.last_lsn,
                    "WAL recovery"
                );
            }
            for entry in entries {
                memtable.apply(entry.operations);
            }
            // Recovered data must be durable in an SSTable before the WAL is cut
            if !memtable.is_empty() {
                storage.flush(&memtable)?;
                memtable.clear();
                replayed = true;
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        if replayed {
            wal.truncate()?;
        }

        tracing::info!(data_dir = %config.data_dir.display(), "engine opened");

        Ok(Self {
            config,
            storage_dir,
            wal: Mutex::new(wal),
            memtable,
            storage,
            write_lock: Mutex::new(()),
            commit_gate: RwLock::new(()),
            lock_file,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    fn acquire_lock(path: &Path, timeout: Duration) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let deadline = Instant::now() + timeout;
        let mut waited = false;
        loop {
            match file.try_lock() {
                Ok(()) => return Ok(file),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(TagaaError::LockTimeout(timeout));
                    }
                    if !waited {
                        tracing::warn!(path = %path.display(), "store is locked, waiting");
                        waited = true;
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(TryLockError::Error(e)) => return Err(e.into()),
            }
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Run `f` against a consistent read-only view
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTxn<'_>) -> Result<T>,
    {
        let _gate = self.commit_gate.read();
        f(&ReadTxn::new(self))
    }

    /// Run `f` as the single writer and commit its writes atomically
    ///
    /// If `f` returns an error nothing it wrote is persisted or made visible.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T>,
    {
        let _writer = self.write_lock.lock();
        let mut txn = WriteTxn::new(self);
        let out = f(&mut txn)?;
        self.commit(txn.into_operations())?;
        Ok(out)
    }

    /// Called with write_lock held
    ///
    /// Errors only if the transaction did not become durable.
    fn commit(&self, operations: Vec<Operation>) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }

        // Durable before visible
        self.wal.lock().append(operations.clone())?;

        let new_size = {
            let _gate = self.commit_gate.write();
            self.memtable.apply(operations)
        };

        // The transaction is committed at this point; a failed flush leaves
        // its data in the MemTable and WAL and is retried by the next commit
        if new_size >= self.config.memtable_size_limit {
            if let Err(e) = self.flush_internal() {
                tracing::warn!(error = %e, "flush after commit failed");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Committed-state reads (used by transactions)
    // =========================================================================

    pub(crate) fn read_committed(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.memtable.get(key) {
            return Ok(entry.into_option());
        }
        Ok(self.storage.get(key)?.and_then(MemTableEntry::into_option))
    }

    pub(crate) fn scan_committed(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged = self.storage.scan_prefix(prefix)?;
        for (key, entry) in self.memtable.scan_prefix(prefix) {
            merged.insert(key, entry);
        }
        Ok(merged
            .into_iter()
            .filter_map(|(key, entry)| entry.into_option().map(|v| (key, v)))
            .collect())
    }

    // =========================================================================
    // Single-key convenience operations
    // =========================================================================

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.view(|tx| tx.get(key))
    }

    /// Put a key-value pair in its own transaction
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.update(|tx| {
            tx.put(key, value);
            Ok(())
        })
    }

    /// Delete a key in its own transaction
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.update(|tx| {
            tx.delete(key);
            Ok(())
        })
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Flush memtable to disk regardless of its size
    pub fn flush(&self) -> Result<()> {
        let _writer = self.write_lock.lock();
        self.flush_internal()
    }

    /// Called with write_lock held
    fn flush_internal(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        {
            let _gate = self.commit_gate.write();
            self.storage.flush(&self.memtable)?;
            self.memtable.clear();
        }

        // Entries are now durable in an SSTable
        self.wal.lock().truncate()?;

        if self.storage.sstable_count() > self.config.max_sstables {
            let _gate = self.commit_gate.write();
            self.storage.compact()?;
        }

        Ok(())
    }

    /// Merge all SSTables into one
    pub fn compact(&self) -> Result<()> {
        let _writer = self.write_lock.lock();
        let _gate = self.commit_gate.write();
        self.storage.compact()?;
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Flushes pending data, syncs the WAL and releases the directory lock.
    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.wal.lock().sync()?;
        self.lock_file.unlock()?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Where SSTables are stored
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
