//! Transactions
//!
//! Handles passed to [`Engine::view`] and [`Engine::update`] closures.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::engine::Engine;
use crate::error::Result;
use crate::wal::Operation;

/// Read access shared by both transaction kinds
pub trait KvRead {
    /// Value stored under `key`, if any
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Live key-value pairs whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Read-only transaction over a stable snapshot
pub struct ReadTxn<'a> {
    engine: &'a Engine,
}

impl<'a> ReadTxn<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }
}

impl KvRead for ReadTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.engine.read_committed(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.engine.scan_committed(prefix)
    }
}

/// Read-write transaction
///
/// Writes stay in `pending` until the closure returns `Ok`; reads see
/// committed state overlaid with this transaction's own writes.
pub struct WriteTxn<'a> {
    engine: &'a Engine,
    /// key → new value, `None` for delete
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            pending: BTreeMap::new(),
        }
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.pending.insert(key.into(), Some(value.into()));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.pending.insert(key.into(), None);
    }

    /// Number of distinct keys written so far
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn into_operations(self) -> Vec<Operation> {
        self.pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => Operation::Put { key, value },
                None => Operation::Delete { key },
            })
            .collect()
    }
}

impl KvRead for WriteTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.engine.read_committed(key),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = self
            .engine
            .scan_committed(prefix)?
            .into_iter()
            .map(|(k, v)| (k, Some(v)))
            .collect();

        let own = self
            .pending
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix));
        for (key, value) in own {
            merged.insert(key.clone(), value.clone());
        }

        Ok(merged
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect())
    }
}
