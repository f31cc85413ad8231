//! Buffer - one frame of the buffer pool.
//!
//! A [`Buffer`] owns a [`Page`] plus the metadata needed for buffer management:
//! - Which block is loaded (if any)
//! - Pin count for reference counting
//! - Dirty flag, and the transaction/LSN of the last pending write

use std::sync::Arc;

use log::trace;
use parking_lot::RwLock;

use crate::common::config::LATCH_TIMEOUT;
use crate::common::{BlockId, Error, Lsn, Result, TxnId};
use crate::recovery::LogManager;
use crate::storage::{BlockStore, Page};

/// A frame in the buffer pool.
///
/// Buffers are allocated once when the pool is built and reused for the life
/// of the process; only the loaded block, contents and flags change.
///
/// # Thread Safety
/// Metadata is plain data: the pool only touches it under its own lock.
/// The page sits behind an `Arc<RwLock<_>>` so pinned callers can read and
/// write it after the pool lock is released.
pub struct Buffer {
    store: Arc<dyn BlockStore>,
    log: Arc<dyn LogManager>,

    /// The page data, shared with page guards.
    contents: Arc<RwLock<Page>>,

    /// Which block is currently loaded, or None if unassigned.
    block_id: Option<BlockId>,

    /// Number of active holders.
    pins: u32,

    /// Transaction of the last write not yet flushed.
    transaction_num: Option<TxnId>,

    /// LSN of the log record describing the last modification.
    lsn: Option<Lsn>,

    /// Whether contents differ from disk.
    is_dirty: bool,
}

impl Buffer {
    /// Create an unassigned buffer with a zeroed page of the store's block size.
    pub fn new(store: Arc<dyn BlockStore>, log: Arc<dyn LogManager>) -> Self {
        let contents = Arc::new(RwLock::new(Page::new(store.block_size())));
        Self {
            store,
            log,
            contents,
            block_id: None,
            pins: 0,
            transaction_num: None,
            lsn: None,
            is_dirty: false,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Shared handle to the page data.
    #[inline]
    pub fn contents(&self) -> &Arc<RwLock<Page>> {
        &self.contents
    }

    #[inline]
    pub fn block_id(&self) -> Option<&BlockId> {
        self.block_id.as_ref()
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pins
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pins > 0
    }

    #[inline]
    pub fn transaction_num(&self) -> Option<TxnId> {
        self.transaction_num
    }

    #[inline]
    pub fn lsn(&self) -> Option<Lsn> {
        self.lsn
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    #[inline]
    pub fn set_dirty(&mut self, is_dirty: bool) {
        self.is_dirty = is_dirty;
    }

    /// Attribute a pending write to `txn`.
    ///
    /// `lsn` is the log record describing the change; `None` means the
    /// change was not logged and the previous LSN is kept.
    pub fn set_modified(&mut self, txn: TxnId, lsn: Option<Lsn>) {
        self.transaction_num = Some(txn);
        if lsn.is_some() {
            self.lsn = lsn;
        }
        self.is_dirty = true;
    }

    #[inline]
    pub fn increment_pin(&mut self) {
        self.pins += 1;
    }

    /// Decrement the pin count. The pool checks for underflow before calling.
    #[inline]
    pub fn decrement_pin(&mut self) {
        debug_assert!(self.pins > 0, "pin count underflow");
        self.pins = self.pins.saturating_sub(1);
    }

    /// Replace the contents with a zero-length placeholder.
    ///
    /// Used when the frame is decommissioned; the next assignment restores
    /// a full-size page.
    pub fn reset_memory(&mut self) {
        *self.contents.write() = Page::new(0);
    }

    /// Forget the loaded block and all pending-write state.
    pub(crate) fn clear(&mut self) {
        self.block_id = None;
        self.transaction_num = None;
        self.lsn = None;
        self.is_dirty = false;
        self.pins = 0;
    }

    // ========================================================================
    // I/O
    // ========================================================================

    /// Load `block` into this buffer.
    ///
    /// Flushes any pending write for the current block first, then reads
    /// `block` from the store and resets the pin count to 0.
    ///
    /// # Errors
    /// - If the flush fails nothing has changed: the buffer still holds its
    ///   old block.
    /// - If the read fails the buffer is left unassigned.
    pub fn assign_to_block(&mut self, block: BlockId) -> Result<()> {
        self.flush()?;
        self.block_id = None;

        {
            let mut page = self.contents.write();
            let block_size = self.store.block_size();
            if page.size() != block_size {
                page.reset_to(block_size);
            }
            self.store.read(&block, &mut page)?;
        }

        trace!("loaded {} into buffer", block);
        self.block_id = Some(block);
        self.pins = 0;
        Ok(())
    }

    /// Take `block` as a brand-new block without reading the store.
    ///
    /// Same flush contract as [`assign_to_block`](Self::assign_to_block);
    /// the page starts zeroed.
    pub fn assign_to_new_block(&mut self, block: BlockId) -> Result<()> {
        self.flush()?;

        self.contents.write().reset_to(self.store.block_size());
        self.block_id = Some(block);
        self.pins = 0;
        Ok(())
    }

    /// Write the page back if a transaction has a pending write on it.
    ///
    /// Returns whether anything was written. The dirty flag is left to the
    /// caller.
    pub fn flush(&mut self) -> Result<bool> {
        if self.transaction_num.is_none() {
            return Ok(false);
        }
        self.force()
    }

    /// Write the page back regardless of transaction attribution, then
    /// clear the dirty flag.
    ///
    /// Used by the pool for frames marked dirty through the unpin protocol.
    pub fn write_back(&mut self) -> Result<bool> {
        let written = self.force()?;
        self.is_dirty = false;
        Ok(written)
    }

    /// Log first, then data.
    fn force(&mut self) -> Result<bool> {
        if let Some(lsn) = self.lsn {
            self.log.flush(lsn)?;
        }

        let written = match &self.block_id {
            Some(block) => {
                let page = self
                    .contents
                    .try_read_for(LATCH_TIMEOUT)
                    .ok_or_else(|| Error::LatchTimeout(block.clone()))?;
                self.store.write(block, &page)?;
                trace!("flushed {}", block);
                true
            }
            None => false,
        };

        self.transaction_num = None;
        Ok(written)
    }
}
