//! Tests for WAL Reader
//!
//! These tests verify:
//! - Reading entries from WAL file
//! - Iterator functionality
//! - Partial write handling
//! - Empty file handling

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tagaa::wal::{Operation, WalEntry, WalReader};
use tagaa::TagaaError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn write_entries_to_wal(path: &PathBuf, entries: &[WalEntry]) {
    let mut file = File::create(path).unwrap();
    for entry in entries {
        file.write_all(&entry.serialize().unwrap()).unwrap();
    }
    file.sync_all().unwrap();
}

fn entry(lsn: u64, key: &str) -> WalEntry {
    WalEntry::new(
        lsn,
        vec![Operation::Put {
            key: key.as_bytes().to_vec(),
            value: format!("value-{}", lsn).into_bytes(),
        }],
    )
}

// =============================================================================
// Basic Reading Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_read_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries = vec![entry(1, "k1"), entry(2, "k2"), entry(3, "k3")];
    write_entries_to_wal(&wal_path, &entries);

    let mut reader = WalReader::open(&wal_path).unwrap();
    for expected in &entries {
        assert_eq!(&reader.next_entry().unwrap().unwrap(), expected);
    }
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), std::fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_iterator_collects_all() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[entry(1, "a"), entry(2, "b")]);

    let lsns: Vec<u64> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap().lsn)
        .collect();

    assert_eq!(lsns, vec![1, 2]);
}

// =============================================================================
// Partial Write Tests
// =============================================================================

#[test]
fn test_partial_tail_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[entry(1, "a")]);
    let good_len = std::fs::metadata(&wal_path).unwrap().len();

    let torn = entry(2, "b").serialize().unwrap();
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&torn[..torn.len() / 2]).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.next_entry().unwrap().unwrap().lsn, 1);
    assert!(matches!(reader.next_entry(), Err(TagaaError::WalCorruption(_))));
    assert_eq!(reader.position(), good_len);
}

#[test]
fn test_iterator_stops_after_error() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[entry(1, "a")]);
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[1, 2, 3]).unwrap();

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}
