//! RAII guard for pinned pages.
//!
//! A [`PageGuard`] holds one pin on a block. Dropping it (or calling
//! [`PageGuard::release`]) performs the matching unpin, passing along
//! whether the page was modified.

use std::sync::Arc;

use log::warn;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{BlockId, FrameId, Lsn, Result, TxnId};
use crate::storage::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// A pinned block.
///
/// While the guard lives, the block stays resident in its frame. Page
/// latches are taken per access through [`read`](Self::read) and
/// [`write`](Self::write); do not call back into the pool while holding one.
///
/// # Deadlock
/// Pool operations that write pages back (eviction, deletion, `flush_*`)
/// take the page's read latch while holding the pool lock. A thread that
/// holds `write()` on a page and then calls into the pool (including by
/// dropping another guard) can therefore wait on a thread that is flushing
/// that page. The write-back gives up after
/// [`LATCH_TIMEOUT`](crate::common::config::LATCH_TIMEOUT) with
/// `Error::LatchTimeout`, which releases the pool lock, but the flush fails.
/// Drop latches before calling into the pool.
///
/// # Example
/// ```ignore
/// let mut guard = bpm.fetch_page(&block)?;
/// guard.write().put_string(0, "hello")?;
/// guard.set_modified(txn, Some(lsn));
/// // guard drops here: page unpinned and marked dirty
/// ```
pub struct PageGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    block_id: BlockId,
    contents: Arc<RwLock<Page>>,
    is_dirty: bool,
    released: bool,
}

impl std::fmt::Debug for PageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard")
            .field("frame_id", &self.frame_id)
            .field("block_id", &self.block_id)
            .field("is_dirty", &self.is_dirty)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl<'a> PageGuard<'a> {
    /// Called by the pool after pinning `block_id` in `frame_id`.
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        block_id: BlockId,
        contents: Arc<RwLock<Page>>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            block_id,
            contents,
            is_dirty: false,
            released: false,
        }
    }

    #[inline]
    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Shared access to the page.
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.contents.read()
    }

    /// Exclusive access to the page. Marks the guard dirty.
    pub fn write(&mut self) -> RwLockWriteGuard<'_, Page> {
        self.is_dirty = true;
        self.contents.write()
    }

    /// Unpin as dirty even if [`write`](Self::write) was never called.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Whether the release will mark the frame dirty.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Attribute the pending write to `txn` at log position `lsn`.
    pub fn set_modified(&mut self, txn: TxnId, lsn: Option<Lsn>) {
        self.is_dirty = true;
        self.bpm.set_modified(self.frame_id, txn, lsn);
    }

    /// Current pin count of the frame (all holders, not just this guard).
    pub fn pin_count(&self) -> u32 {
        self.bpm.frame_pin_count(self.frame_id)
    }

    /// Transaction with a pending write on the frame.
    pub fn transaction_num(&self) -> Option<TxnId> {
        self.bpm.frame_transaction_num(self.frame_id)
    }

    /// Unpin now, surfacing protocol errors that `Drop` can only log.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.bpm.unpin_page(&self.block_id, self.is_dirty)
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.bpm.unpin_page(&self.block_id, self.is_dirty) {
            warn!("implicit unpin of {} failed: {}", self.block_id, e);
        }
    }
}
