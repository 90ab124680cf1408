//! Tests for WAL Writer
//!
//! These tests verify:
//! - Writing entries to WAL
//! - LSN generation and sequencing (including across reopen/truncate)
//! - Sync strategies (EveryWrite, EveryNEntries)
//! - Integration with reader

use std::path::PathBuf;

use tagaa::config::WalSyncStrategy;
use tagaa::wal::{Operation, WalReader, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(key: &str, value: &str) -> Vec<Operation> {
    vec![Operation::Put {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }]
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn = writer.append(put("key1", "value1")).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.next_lsn(), 2);
}

#[test]
fn test_write_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    let lsn1 = writer.append(put("a", "1")).unwrap();
    let lsn2 = writer.append(put("b", "2")).unwrap();
    let lsn3 = writer.append(vec![Operation::Delete { key: b"a".to_vec() }]).unwrap();

    assert_eq!((lsn1, lsn2, lsn3), (1, 2, 3));
    assert_eq!(writer.next_lsn(), 4);
}

#[test]
fn test_written_entries_readable() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("a", "1")).unwrap();
        writer
            .append(vec![
                Operation::Put { key: b"b".to_vec(), value: b"2".to_vec() },
                Operation::Delete { key: b"a".to_vec() },
            ])
            .unwrap();
    }

    let entries: Vec<_> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap())
        .collect();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].operations.len(), 2);
}

// =============================================================================
// LSN Continuity Tests
// =============================================================================

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("a", "1")).unwrap();
        writer.append(put("b", "2")).unwrap();
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.next_lsn(), 3);
    assert_eq!(writer.append(put("c", "3")).unwrap(), 3);
}

#[test]
fn test_truncate_empties_file_but_keeps_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(put("a", "1")).unwrap();
    writer.append(put("b", "2")).unwrap();

    writer.truncate().unwrap();
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);

    assert_eq!(writer.append(put("c", "3")).unwrap(), 3);
    let entries: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].as_ref().unwrap().lsn, 3);
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_every_n_entries_data_visible_after_sync() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 10 }).unwrap();

    for i in 0..5 {
        writer.append(put(&format!("k{}", i), "v")).unwrap();
    }
    writer.sync().unwrap();

    let count = WalReader::open(&wal_path).unwrap().entries().count();
    assert_eq!(count, 5);
}
