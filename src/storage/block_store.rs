//! The block store interface consumed by buffers.

use crate::common::{BlockId, Result};
use crate::storage::Page;

/// Maps a [`BlockId`] to a fixed-size region of a named file.
///
/// Implementations must be shareable: every buffer in the pool holds a
/// handle to the same store.
pub trait BlockStore: Send + Sync {
    /// Read `block` into `page`. The page must be `block_size()` bytes.
    fn read(&self, block: &BlockId, page: &mut Page) -> Result<()>;

    /// Write `page` to `block`.
    fn write(&self, block: &BlockId, page: &Page) -> Result<()>;

    /// Extend `file_name` by one zeroed block and return its id.
    fn append(&self, file_name: &str) -> Result<BlockId>;

    /// Number of blocks currently in `file_name`.
    fn block_count(&self, file_name: &str) -> Result<u32>;

    /// Size of every block in bytes.
    fn block_size(&self) -> usize;
}
