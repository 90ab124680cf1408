//! # tagaa
//!
//! An embedded store for image tagging metadata. Images live in named,
//! non-overlapping groups; each group hands out its own never-reused image
//! IDs. Every operation is an atomic transaction against a single-writer
//! engine with:
//! - Write-Ahead Logging (one entry per committed transaction)
//! - Crash recovery with partial write handling
//! - Snapshot reads concurrent with the single writer
//! - An exclusive, timeout-guarded lock on the data directory
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                CLI / web request handlers                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  ImageStore
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     GroupStore                               │
//! │        (keys + record codec, one txn per operation)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  view / update
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Storage   │
//!                           │  (SSTable)  │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod txn;
pub mod engine;

pub mod model;
pub mod keys;
pub mod codec;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TagaaError, Result};
pub use config::Config;
pub use engine::Engine;
pub use model::{Group, Image, Rating, SUPPORTED_EXTENSIONS};
pub use store::{GroupStore, ImageStore};
pub use txn::KvRead;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tagaa
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
