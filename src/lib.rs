//! SimpleDB buffer layer - block caching for a teaching database engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │        Record / Transaction layers (callers, not here)          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                              ↓ pin / unpin / flush_all(txn)     │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Buffer Pool (buffer/)                     │   │
//! │  │    BufferPoolManager + Buffer + PageGuard + LruReplacer  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │               ↓ flush(lsn)                 ↓ read / write       │
//! │  ┌──────────────────────────┐  ┌──────────────────────────┐    │
//! │  │   Log (recovery/)        │  │   Storage (storage/)     │    │
//! │  │   LogManager             │  │   BlockStore + Page      │    │
//! │  │   FileLogManager         │  │   DiskManager            │    │
//! │  └──────────────────────────┘  └──────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction policy
//! - [`storage`] - Block I/O and the page format
//! - [`recovery`] - Write-ahead log flushing
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use simpledb::{BufferPoolConfig, BufferPoolManager, DiskManager, FileLogManager, BLOCK_SIZE};
//!
//! # fn main() -> simpledb::Result<()> {
//! let store = Arc::new(DiskManager::new("my_database", BLOCK_SIZE)?);
//! let log = Arc::new(FileLogManager::open("my_database/simpledb.log")?);
//! let bpm = BufferPoolManager::new(BufferPoolConfig::new(8), store, log)?;
//!
//! let mut guard = bpm.new_page()?;
//! guard.write().put_string(0, "hello")?;
//! drop(guard);
//!
//! bpm.flush_all_pages()?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod common;
pub mod recovery;
pub mod storage;

pub use buffer::{Buffer, BufferPoolManager, BufferPoolStats, PageGuard, StatsSnapshot};
pub use common::config::{BufferPoolConfig, BLOCK_SIZE};
pub use common::{BlockId, Error, FrameId, Lsn, Result, TxnId};
pub use recovery::{FileLogManager, LogManager};
pub use storage::{BlockStore, DiskManager, Page};
