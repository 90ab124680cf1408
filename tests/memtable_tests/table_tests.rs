//! MemTable Tests
//!
//! Tests verify:
//! - Basic put/get/delete operations
//! - Size tracking
//! - Tombstone handling
//! - Batch apply and prefix scans
//! - Sorted iteration and clear
//! - Concurrent readers

use std::sync::Arc;
use std::thread;

use tagaa::memtable::{MemTable, MemTableEntry};
use tagaa::wal::Operation;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_memtable_is_empty() {
    let memtable = MemTable::new();
    assert_eq!(memtable.entry_count(), 0);
    assert_eq!(memtable.size(), 0);
    assert!(memtable.is_empty());
}

#[test]
fn test_put_and_get() {
    let memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());

    assert_eq!(
        memtable.get(b"key1"),
        Some(MemTableEntry::Value(b"value1".to_vec()))
    );
    assert_eq!(memtable.get(b"missing"), None);
}

#[test]
fn test_delete_creates_tombstone() {
    let memtable = MemTable::new();
    memtable.put(b"key".to_vec(), b"value".to_vec());
    memtable.delete(b"key".to_vec());

    assert_eq!(memtable.get(b"key"), Some(MemTableEntry::Tombstone));
    assert_eq!(memtable.entry_count(), 1);
}

// =============================================================================
// Size Tracking Tests
// =============================================================================

#[test]
fn test_size_tracking() {
    let memtable = MemTable::new();

    assert_eq!(memtable.put(b"key".to_vec(), b"value".to_vec()), 8);
    // Overwrite swaps the value weight, key counted once
    assert_eq!(memtable.put(b"key".to_vec(), b"v".to_vec()), 4);
    // Tombstone keeps the key weight only
    assert_eq!(memtable.delete(b"key".to_vec()), 3);
    assert_eq!(memtable.delete(b"other".to_vec()), 8);
}

#[test]
fn test_should_flush() {
    let memtable = MemTable::new();
    memtable.put(b"12345".to_vec(), b"12345".to_vec());

    assert!(!memtable.should_flush(11));
    assert!(memtable.should_flush(10));
    assert!(memtable.should_flush(9));
}

// =============================================================================
// Batch / Scan Tests
// =============================================================================

#[test]
fn test_apply_batch() {
    let memtable = MemTable::new();
    memtable.put(b"a".to_vec(), b"old".to_vec());

    let size = memtable.apply(vec![
        Operation::Put { key: b"a".to_vec(), value: b"new".to_vec() },
        Operation::Put { key: b"b".to_vec(), value: b"2".to_vec() },
        Operation::Delete { key: b"c".to_vec() },
    ]);

    assert_eq!(size, memtable.size());
    assert_eq!(memtable.get(b"a"), Some(MemTableEntry::Value(b"new".to_vec())));
    assert_eq!(memtable.get(b"b"), Some(MemTableEntry::Value(b"2".to_vec())));
    assert_eq!(memtable.get(b"c"), Some(MemTableEntry::Tombstone));
}

#[test]
fn test_scan_prefix() {
    let memtable = MemTable::new();
    memtable.put(b"ia\x00\x02".to_vec(), b"2".to_vec());
    memtable.put(b"ia\x00\x01".to_vec(), b"1".to_vec());
    memtable.put(b"iab\x00\x01".to_vec(), b"other group".to_vec());
    memtable.put(b"ga".to_vec(), b"group".to_vec());
    memtable.delete(b"ia\x00\x03".to_vec());

    let keys: Vec<Vec<u8>> = memtable
        .scan_prefix(b"ia\x00")
        .into_iter()
        .map(|(k, _)| k)
        .collect();

    assert_eq!(
        keys,
        vec![b"ia\x00\x01".to_vec(), b"ia\x00\x02".to_vec(), b"ia\x00\x03".to_vec()]
    );
}

// =============================================================================
// Iteration / Clear Tests
// =============================================================================

#[test]
fn test_iter_sorted_order_with_tombstones() {
    let memtable = MemTable::new();
    memtable.put(b"c".to_vec(), b"3".to_vec());
    memtable.put(b"a".to_vec(), b"1".to_vec());
    memtable.delete(b"b".to_vec());

    let entries: Vec<_> = memtable.iter().collect();

    assert_eq!(
        entries,
        vec![
            (b"a".to_vec(), MemTableEntry::Value(b"1".to_vec())),
            (b"b".to_vec(), MemTableEntry::Tombstone),
            (b"c".to_vec(), MemTableEntry::Value(b"3".to_vec())),
        ]
    );
}

#[test]
fn test_clear() {
    let memtable = MemTable::new();
    memtable.put(b"a".to_vec(), b"1".to_vec());
    memtable.delete(b"b".to_vec());

    memtable.clear();

    assert!(memtable.is_empty());
    assert_eq!(memtable.size(), 0);
    assert_eq!(memtable.get(b"a"), None);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_reads_see_whole_batches() {
    let memtable = Arc::new(MemTable::new());
    let mut handles = Vec::new();

    let writer = Arc::clone(&memtable);
    handles.push(thread::spawn(move || {
        for i in 0..200u32 {
            let value = i.to_be_bytes().to_vec();
            writer.apply(vec![
                Operation::Put { key: b"x".to_vec(), value: value.clone() },
                Operation::Put { key: b"y".to_vec(), value },
            ]);
        }
    }));

    for _ in 0..4 {
        let reader = Arc::clone(&memtable);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                let pair = reader.scan_prefix(b"");
                if pair.len() == 2 {
                    assert_eq!(pair[0].1, pair[1].1);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}
