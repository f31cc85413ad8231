//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Block caching between the block store and memory
//! - Pin-based reference counting with RAII release
//! - Dirty write-back in write-ahead-log order
//! - LRU eviction of unpinned frames

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;

use crate::buffer::replacer::{LruReplacer, Replacer};
use crate::buffer::{Buffer, BufferPoolStats, PageGuard};
use crate::common::config::BufferPoolConfig;
use crate::common::{BlockId, Error, FrameId, Lsn, Result, TxnId};
use crate::recovery::LogManager;
use crate::storage::BlockStore;

/// Manages a fixed pool of buffers caching disk blocks.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │               BufferPoolManager  (one Mutex)                │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ buffer_table │  │      buffers: Vec<Buffer>         │   │
/// │  │BlockId → Fid │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │    store     │      │
/// │  │VecDeque<Fid> │  │ LruReplacer  │  │ (append new) │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// Every public operation holds the single pool lock for its whole
/// duration, including any flush or load I/O it performs. Operations are
/// therefore totally ordered by lock acquisition. Only page contents are
/// reachable outside the lock, through a [`PageGuard`] that holds a pin.
///
/// # Usage
/// ```ignore
/// let bpm = BufferPoolManager::new(BufferPoolConfig::new(10), store, log)?;
///
/// // Allocate a new block
/// let mut guard = bpm.new_page()?;
/// guard.write().put_string(0, "hello")?;
/// // guard drops: frame marked dirty, unpinned
///
/// let guard = bpm.fetch_page(&block)?;
/// let s = guard.read().get_string(0)?;
/// ```
pub struct BufferPoolManager {
    state: Mutex<PoolState>,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Number of frames in the pool (immutable after construction).
    pool_size: usize,

    /// Allocates the blocks handed out by `new_page`.
    store: Arc<dyn BlockStore>,

    /// File that `new_page` allocates blocks in.
    file_name: String,
}

/// Everything guarded by the pool lock.
struct PoolState {
    buffers: Vec<Buffer>,

    /// Maps resident blocks to their frames.
    buffer_table: HashMap<BlockId, FrameId>,

    /// Frames holding no block (FIFO).
    free_list: VecDeque<FrameId>,

    replacer: Box<dyn Replacer>,
}

/// How a frame gets its new block's contents.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Load {
    /// Read the block from the store.
    Read,
    /// Read, but drop an evicted frame's memory first.
    ReadReset,
    /// Brand-new block: start zeroed.
    Fresh,
}

impl PoolState {
    /// Pin `block` if resident.
    fn pin_resident(&mut self, block: &BlockId) -> Option<FrameId> {
        let frame_id = *self.buffer_table.get(block)?;
        self.buffers[frame_id.0].increment_pin();
        self.replacer.pin(frame_id);
        Some(frame_id)
    }

    fn all_pinned(&self) -> bool {
        self.buffers.iter().all(Buffer::is_pinned)
    }
}

impl BufferPoolManager {
    /// Create a buffer pool with an LRU replacer.
    ///
    /// # Errors
    /// - `Error::InvalidPoolSize` if `config.pool_size` is 0
    pub fn new(
        config: BufferPoolConfig,
        store: Arc<dyn BlockStore>,
        log: Arc<dyn LogManager>,
    ) -> Result<Self> {
        let replacer = Box::new(LruReplacer::new(config.pool_size));
        Self::with_replacer(config, store, log, replacer)
    }

    /// Create a buffer pool with a custom replacement policy.
    pub fn with_replacer(
        config: BufferPoolConfig,
        store: Arc<dyn BlockStore>,
        log: Arc<dyn LogManager>,
        replacer: Box<dyn Replacer>,
    ) -> Result<Self> {
        let pool_size = config.pool_size;
        if pool_size == 0 {
            return Err(Error::InvalidPoolSize);
        }

        let buffers = (0..pool_size)
            .map(|_| Buffer::new(Arc::clone(&store), Arc::clone(&log)))
            .collect();
        let free_list = (0..pool_size).map(FrameId::new).collect();

        Ok(Self {
            state: Mutex::new(PoolState {
                buffers,
                buffer_table: HashMap::new(),
                free_list,
                replacer,
            }),
            stats: BufferPoolStats::new(),
            pool_size,
            store,
            file_name: config.file_name,
        })
    }

    // ========================================================================
    // Public API: Pin pages
    // ========================================================================

    /// Pin `block`, loading it from the store if it is not resident.
    ///
    /// A free frame is preferred over evicting one. A dirty victim is
    /// written back before its frame is reused.
    ///
    /// # Errors
    /// - `Error::NoAvailableFrame` if the free list is empty and no frame
    ///   is unpinned
    /// - I/O errors from writing back the victim or loading `block`; the
    ///   block's residency is unchanged
    pub fn fetch_page(&self, block: &BlockId) -> Result<PageGuard<'_>> {
        let mut state = self.state.lock();

        if let Some(frame_id) = state.pin_resident(block) {
            self.stats.record_hit();
            trace!("fetch hit {} in {}", block, frame_id);
            return Ok(self.guard(&state, frame_id, block));
        }

        self.stats.record_miss();
        let frame_id = self.select_frame(&mut state)?;
        self.install(&mut state, frame_id, block, Load::Read)?;
        Ok(self.guard(&state, frame_id, block))
    }

    /// Pin `block`, failing fast when every frame is pinned.
    ///
    /// Like [`fetch_page`](Self::fetch_page), but an evicted frame has its
    /// memory reset before reuse, and the returned guard is meant for
    /// callers that manage the buffer's dirty and transaction state.
    ///
    /// # Errors
    /// - `Error::AllPinned` if every frame has a pin count above zero
    /// - Same as `fetch_page` otherwise
    pub fn pin_page(&self, block: &BlockId) -> Result<PageGuard<'_>> {
        let mut state = self.state.lock();

        if state.all_pinned() {
            return Err(Error::AllPinned);
        }

        if let Some(frame_id) = state.pin_resident(block) {
            self.stats.record_hit();
            return Ok(self.guard(&state, frame_id, block));
        }

        self.stats.record_miss();
        let frame_id = self.select_frame(&mut state)?;
        self.install(&mut state, frame_id, block, Load::ReadReset)?;
        Ok(self.guard(&state, frame_id, block))
    }

    /// Allocate a new block in the pool's file and pin it.
    ///
    /// The block is allocated by [`BlockStore::append`], so its number is
    /// never shared with another allocator of the same file and numbers
    /// strictly increase. The page starts zeroed; nothing is read from the
    /// store.
    ///
    /// # Errors
    /// - `Error::AllPinned` if every frame has a pin count above zero
    /// - `Error::NoAvailableFrame` / I/O errors as for `fetch_page`
    /// - errors from `append`; no frame has been taken at that point
    pub fn new_page(&self) -> Result<PageGuard<'_>> {
        let mut state = self.state.lock();

        if state.all_pinned() {
            return Err(Error::AllPinned);
        }

        let frame_id = self.select_frame(&mut state)?;
        let block = self.store.append(&self.file_name)?;

        self.install(&mut state, frame_id, &block, Load::Fresh)?;
        debug!("allocated {} in {}", block, frame_id);
        Ok(self.guard(&state, frame_id, &block))
    }

    /// Release one pin on `block`, marking it dirty if `is_dirty`.
    ///
    /// A block that is not resident is treated as already unpinned.
    ///
    /// # Errors
    /// `Error::ProtocolViolation` if the pin count is already zero; nothing
    /// changes in that case.
    pub fn unpin_page(&self, block: &BlockId, is_dirty: bool) -> Result<()> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.buffer_table.get(block) else {
            return Ok(());
        };

        let buffer = &mut state.buffers[frame_id.0];
        if !buffer.is_pinned() {
            return Err(Error::ProtocolViolation(block.clone()));
        }
        if is_dirty {
            buffer.set_dirty(true);
        }
        buffer.decrement_pin();
        let now_unpinned = !buffer.is_pinned();

        if now_unpinned {
            state.replacer.unpin(frame_id);
        }
        trace!("unpinned {} (dirty: {})", block, is_dirty);
        Ok(())
    }

    // ========================================================================
    // Public API: Delete pages
    // ========================================================================

    /// Drop `block` from the pool and return its frame to the free list.
    ///
    /// Returns `Ok(false)` if the block is still pinned, `Ok(true)` once it
    /// is gone (or was never resident). Dirty contents are written back
    /// first.
    pub fn delete_page(&self, block: &BlockId) -> Result<bool> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.buffer_table.get(block) else {
            return Ok(true);
        };

        let buffer = &mut state.buffers[frame_id.0];
        if buffer.is_pinned() {
            return Ok(false);
        }
        if buffer.is_dirty() && buffer.write_back()? {
            self.stats.record_write();
        }
        buffer.reset_memory();
        buffer.clear();

        state.buffer_table.remove(block);
        state.replacer.remove(frame_id);
        state.free_list.push_back(frame_id);
        debug!("deleted {} from {}", block, frame_id);
        Ok(true)
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Flush every buffer with a pending write from `txn` and clear its
    /// dirty flag. Called at commit.
    pub fn flush_all(&self, txn: TxnId) -> Result<()> {
        let mut state = self.state.lock();

        for buffer in state.buffers.iter_mut() {
            if buffer.transaction_num() == Some(txn) {
                if buffer.flush()? {
                    self.stats.record_write();
                }
                buffer.set_dirty(false);
            }
        }
        Ok(())
    }

    /// Write `block` back if it is resident and dirty.
    pub fn flush_page(&self, block: &BlockId) -> Result<()> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.buffer_table.get(block) else {
            return Ok(());
        };
        let buffer = &mut state.buffers[frame_id.0];
        if buffer.is_dirty() && buffer.write_back()? {
            self.stats.record_write();
        }
        Ok(())
    }

    /// Write back every dirty frame.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut state = self.state.lock();

        for buffer in state.buffers.iter_mut() {
            if buffer.is_dirty() && buffer.write_back()? {
                self.stats.record_write();
            }
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of frames with a pin count of zero.
    pub fn available(&self) -> usize {
        let state = self.state.lock();
        state.buffers.iter().filter(|b| !b.is_pinned()).count()
    }

    /// Number of frames on the free list.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of resident blocks.
    pub fn page_count(&self) -> usize {
        self.state.lock().buffer_table.len()
    }

    /// Pin count of `block`, or None if it is not resident.
    pub fn pin_count(&self, block: &BlockId) -> Option<u32> {
        let state = self.state.lock();
        let frame_id = state.buffer_table.get(block)?;
        Some(state.buffers[frame_id.0].pin_count())
    }

    pub fn is_resident(&self, block: &BlockId) -> bool {
        self.state.lock().buffer_table.contains_key(block)
    }

    // ========================================================================
    // Internal: Called by PageGuard
    // ========================================================================

    pub(crate) fn set_modified(&self, frame_id: FrameId, txn: TxnId, lsn: Option<Lsn>) {
        self.state.lock().buffers[frame_id.0].set_modified(txn, lsn);
    }

    pub(crate) fn frame_pin_count(&self, frame_id: FrameId) -> u32 {
        self.state.lock().buffers[frame_id.0].pin_count()
    }

    pub(crate) fn frame_transaction_num(&self, frame_id: FrameId) -> Option<TxnId> {
        self.state.lock().buffers[frame_id.0].transaction_num()
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    fn guard(&self, state: &PoolState, frame_id: FrameId, block: &BlockId) -> PageGuard<'_> {
        let contents = Arc::clone(state.buffers[frame_id.0].contents());
        PageGuard::new(self, frame_id, block.clone(), contents)
    }

    /// Pick the frame the next block goes into, without taking it yet.
    ///
    /// The head of the free list wins; otherwise the replacer's next victim.
    /// A dirty victim is written back here. If that fails the victim keeps
    /// its block and its place in the replacer.
    fn select_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(&frame_id) = state.free_list.front() {
            return Ok(frame_id);
        }

        let frame_id = state
            .replacer
            .peek_victim()
            .ok_or(Error::NoAvailableFrame)?;
        let buffer = &mut state.buffers[frame_id.0];
        if (buffer.is_dirty() || buffer.transaction_num().is_some()) && buffer.write_back()? {
            self.stats.record_write();
        }
        Ok(frame_id)
    }

    /// Assign `block` to the frame chosen by `select_frame` and pin it.
    ///
    /// The frame leaves the free list or the replacer only once the
    /// assignment succeeded. If the load fails after the old block was
    /// dropped, the frame ends up on the free list.
    fn install(
        &self,
        state: &mut PoolState,
        frame_id: FrameId,
        block: &BlockId,
        load: Load,
    ) -> Result<()> {
        let from_free_list = state.free_list.front() == Some(&frame_id);
        let buffer = &mut state.buffers[frame_id.0];
        let old = buffer.block_id().cloned();

        if load == Load::ReadReset && !from_free_list {
            buffer.reset_memory();
        }
        let assigned = match load {
            Load::Read | Load::ReadReset => buffer.assign_to_block(block.clone()),
            Load::Fresh => buffer.assign_to_new_block(block.clone()),
        };

        if let Err(e) = assigned {
            if buffer.block_id() != old.as_ref() {
                buffer.clear();
                if let Some(old) = &old {
                    state.buffer_table.remove(old);
                }
                if !from_free_list {
                    state.replacer.remove(frame_id);
                    state.free_list.push_back(frame_id);
                }
            }
            return Err(e);
        }

        // Pin count was reset by the assignment
        buffer.increment_pin();
        if from_free_list {
            state.free_list.pop_front();
        } else {
            self.stats.record_eviction();
            if let Some(old) = &old {
                debug!("evicting {} from {}", old, frame_id);
                state.buffer_table.remove(old);
            }
        }
        state.buffer_table.insert(block.clone(), frame_id);
        state.replacer.pin(frame_id);

        if load != Load::Fresh {
            self.stats.record_read();
        }
        Ok(())
    }
}
