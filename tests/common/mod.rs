//! Shared fixtures for integration tests.
//!
//! [`MemStore`] is an in-memory block store and log that records every
//! call in order, with switches to make writes, reads or log flushes fail.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use simpledb::{
    BlockId, BlockStore, BufferPoolConfig, BufferPoolManager, Error, LogManager, Lsn, Page, Result,
};

pub const TEST_BLOCK_SIZE: usize = 400;
pub const TEST_FILE: &str = "test.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LogFlush(Lsn),
    Read(BlockId),
    Write(BlockId),
}

#[derive(Default)]
pub struct MemStore {
    events: Mutex<Vec<Event>>,
    blocks: Mutex<HashMap<BlockId, Vec<u8>>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_log: AtomicBool,
    pub fail_appends: AtomicBool,
}

impl MemStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Blocks written to `block`, in order.
    pub fn writes_to(&self, block: &BlockId) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Event::Write(b) if b == block))
            .count()
    }

    /// The stored image of `block`, or None if never written.
    pub fn stored(&self, block: &BlockId) -> Option<Page> {
        self.blocks.lock().get(block).cloned().map(Page::from_bytes)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_log(&self, fail: bool) {
        self.fail_log.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }
}

fn injected(what: &str) -> Error {
    Error::io(what, std::io::Error::other("injected failure"))
}

impl BlockStore for MemStore {
    fn read(&self, block: &BlockId, page: &mut Page) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("reading block"));
        }
        self.events.lock().push(Event::Read(block.clone()));
        match self.blocks.lock().get(block) {
            Some(data) => page.as_mut_slice().copy_from_slice(data),
            None => page.reset(),
        }
        Ok(())
    }

    fn write(&self, block: &BlockId, page: &Page) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("writing block"));
        }
        self.events.lock().push(Event::Write(block.clone()));
        self.blocks
            .lock()
            .insert(block.clone(), page.as_slice().to_vec());
        Ok(())
    }

    fn append(&self, file_name: &str) -> Result<BlockId> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(injected("appending block"));
        }
        let block = BlockId::new(file_name, self.block_count(file_name)?);
        self.blocks
            .lock()
            .insert(block.clone(), vec![0; TEST_BLOCK_SIZE]);
        Ok(block)
    }

    fn block_count(&self, file_name: &str) -> Result<u32> {
        Ok(self
            .blocks
            .lock()
            .keys()
            .filter(|b| b.file_name() == file_name)
            .map(|b| b.block_num() + 1)
            .max()
            .unwrap_or(0))
    }

    fn block_size(&self) -> usize {
        TEST_BLOCK_SIZE
    }
}

impl LogManager for MemStore {
    fn flush(&self, lsn: Lsn) -> Result<()> {
        if self.fail_log.load(Ordering::SeqCst) {
            return Err(Error::Log {
                lsn,
                source: std::io::Error::other("injected failure"),
            });
        }
        self.events.lock().push(Event::LogFlush(lsn));
        Ok(())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A pool of `pool_size` frames over a fresh [`MemStore`].
pub fn mem_bpm(pool_size: usize) -> (BufferPoolManager, Arc<MemStore>) {
    let store = MemStore::new();
    (pool_over(&store, pool_size), store)
}

/// Another pool sharing `store`.
pub fn pool_over(store: &Arc<MemStore>, pool_size: usize) -> BufferPoolManager {
    init_logging();
    BufferPoolManager::new(
        BufferPoolConfig::new(pool_size).with_file_name(TEST_FILE),
        store.clone(),
        store.clone(),
    )
    .unwrap()
}

pub fn block(n: u32) -> BlockId {
    BlockId::new(TEST_FILE, n)
}
